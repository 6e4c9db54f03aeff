use scanmatch::lowlevel::{normalize_rows, padded_stride, IntegralImage};
use scanmatch::{NormalizedRaster, Orientation, RasterImage, RgbView, ScanMatchError};

#[test]
fn raster_validates_stride_and_length() {
    let err = RasterImage::new(vec![0u8; 12], 3, 1, 24, 9, Orientation::TopDown).unwrap_err();
    assert_eq!(
        err,
        ScanMatchError::InvalidStride {
            stride: 9,
            min_stride: 12
        }
    );

    let err = RasterImage::new(vec![0u8; 20], 3, 2, 24, 12, Orientation::TopDown).unwrap_err();
    assert_eq!(
        err,
        ScanMatchError::BufferSizeMismatch {
            expected: 24,
            got: 20
        }
    );

    let err = RasterImage::new(vec![0u8; 8], 2, 2, 12, 4, Orientation::TopDown).unwrap_err();
    assert_eq!(err, ScanMatchError::UnsupportedBitDepth { bits: 12 });

    let err = RasterImage::new(Vec::new(), 0, 2, 24, 4, Orientation::TopDown).unwrap_err();
    assert_eq!(err, ScanMatchError::InvalidDimensions { width: 0, height: 2 });

    assert!(RasterImage::new(vec![0u8; 24], 3, 2, 24, 12, Orientation::TopDown).is_ok());
}

#[test]
fn from_packed_inserts_row_padding() {
    let packed: Vec<u8> = (0u8..12).collect();
    let raster = RasterImage::from_packed(&packed, 2, 2, 24, Orientation::TopDown).unwrap();
    assert_eq!(raster.stride(), 8);
    assert_eq!(raster.data(), &[0, 1, 2, 3, 4, 5, 0, 0, 6, 7, 8, 9, 10, 11, 0, 0]);
    assert_eq!(padded_stride(2, 24).unwrap(), raster.stride());
}

#[test]
fn bottom_up_rows_are_reversed() {
    let packed = [1u8, 1, 1, 2, 2, 2, 3, 3, 3];
    let raster = RasterImage::from_packed(&packed, 1, 3, 24, Orientation::BottomUp).unwrap();
    let rows = normalize_rows(&raster);
    assert_eq!(&rows[..], &[3, 3, 3, 0, 2, 2, 2, 0, 1, 1, 1, 0]);

    let normalized = NormalizedRaster::from_raster(&raster);
    assert_eq!(normalized.data(), &[3, 3, 3, 2, 2, 2, 1, 1, 1]);
    assert_eq!(normalized.view().pixel(0, 0), Some([3, 3, 3]));
}

#[test]
fn top_down_rows_are_borrowed() {
    let raster = RasterImage::from_packed(&[9u8; 6], 2, 1, 24, Orientation::TopDown).unwrap();
    assert!(matches!(normalize_rows(&raster), std::borrow::Cow::Borrowed(_)));
}

#[test]
fn bit_depths_repack_to_three_channels() {
    let bgra = RasterImage::from_packed(&[10, 20, 30, 255, 40, 50, 60, 0], 2, 1, 32, Orientation::TopDown)
        .unwrap();
    assert_eq!(NormalizedRaster::from_raster(&bgra).data(), &[10, 20, 30, 40, 50, 60]);

    // RGB555 little endian: r=31, g=0, b=16.
    let value: u16 = (31 << 10) | 16;
    let rgb555 =
        RasterImage::from_packed(&value.to_le_bytes(), 1, 1, 16, Orientation::TopDown).unwrap();
    assert_eq!(NormalizedRaster::from_raster(&rgb555).data(), &[132, 0, 255]);

    let gray = RasterImage::from_packed(&[7, 200], 2, 1, 8, Orientation::TopDown).unwrap();
    assert_eq!(NormalizedRaster::from_raster(&gray).data(), &[7, 7, 7, 200, 200, 200]);

    let nibbles = RasterImage::from_packed(&[0xF1, 0x20], 3, 1, 4, Orientation::TopDown).unwrap();
    assert_eq!(
        NormalizedRaster::from_raster(&nibbles).data(),
        &[255, 255, 255, 17, 17, 17, 34, 34, 34]
    );

    let bits = RasterImage::from_packed(&[0b1010_0000], 3, 1, 1, Orientation::TopDown).unwrap();
    assert_eq!(
        NormalizedRaster::from_raster(&bits).data(),
        &[255, 255, 255, 0, 0, 0, 255, 255, 255]
    );
}

#[test]
fn rgb_view_respects_stride() {
    let data: Vec<u8> = (0u8..24).collect();
    let view = RgbView::new(&data, 2, 2, 12).unwrap();
    assert_eq!(view.row(1), Some(&data[12..18]));
    assert_eq!(view.pixel(1, 1), Some([15, 16, 17]));
    assert_eq!(view.pixel(2, 0), None);
    assert!(RgbView::new(&data, 3, 2, 8).is_err());
}

#[test]
fn integral_image_sums_window_energy() {
    let data = vec![2u8; 4 * 3 * 3];
    let view = RgbView::from_slice(&data, 4, 3).unwrap();
    let integral = IntegralImage::build(view).unwrap();
    assert_eq!(integral.width(), 4);
    assert_eq!(integral.height(), 3);
    // 4 per channel, 3 channels, 2x2 pixels.
    assert_eq!(integral.rect_sum_sq(1, 1, 2, 2), 48);
    assert_eq!(integral.rect_sum_sq(0, 0, 4, 3), 144);
}
