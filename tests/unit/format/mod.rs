use super::*;

#[test]
fn named_formats_parse_and_display() {
    for name in PixelFormat::names() {
        let f: PixelFormat = name.parse().unwrap();
        assert_eq!(f.to_string(), name);
        assert!(f.validate().is_ok(), "{name}");
    }
    assert_eq!(
        " A8R8G8B8 ".parse::<PixelFormat>().unwrap(),
        PixelFormat::A8R8G8B8
    );
    assert!("a9r9g9b9".parse::<PixelFormat>().is_err());
}

#[test]
fn wide_formats_are_detected() {
    assert!(PixelFormat::A2R10G10B10.is_wide());
    assert!(PixelFormat::RGBA_FLOAT.is_wide());
    assert!(!PixelFormat::A8R8G8B8.is_wide());
    assert!(!PixelFormat::R5G6B5.is_wide());
    assert!(!PixelFormat::A1.is_wide());
}

#[test]
fn row_bytes_rounds_sub_byte_formats_up() {
    assert_eq!(PixelFormat::A1.row_bytes(9), Some(2));
    assert_eq!(PixelFormat::A4.row_bytes(3), Some(2));
    assert_eq!(PixelFormat::R8G8B8.row_bytes(5), Some(15));
    assert_eq!(PixelFormat::RGBA_FLOAT.row_bytes(2), Some(32));
    assert_eq!(PixelFormat::A8R8G8B8.row_bytes(usize::MAX), None);
}

#[test]
fn custom_descriptors_are_validated() {
    assert!(PixelFormat::new(16, ChannelOrder::Argb, 0, 5, 6, 5).is_ok());
    assert!(PixelFormat::new(16, ChannelOrder::Argb, 8, 8, 8, 8).is_err());
    assert!(PixelFormat::new(12, ChannelOrder::Argb, 0, 4, 4, 4).is_err());
    assert!(PixelFormat::new(8, ChannelOrder::A, 8, 1, 0, 0).is_err());
    assert!(PixelFormat::new(32, ChannelOrder::Argb, 8, 0, 0, 0).is_err());
    assert!(PixelFormat::new(64, ChannelOrder::Float, 0, 32, 32, 32).is_err());

    let custom = PixelFormat::new(32, ChannelOrder::Argb, 4, 8, 8, 8).unwrap();
    assert_eq!(custom.name(), None);
    assert!(custom.to_string().contains("32bpp"));
}

#[test]
fn shifts_follow_channel_order() {
    let s = PixelFormat::A8R8G8B8.shifts();
    assert_eq!((s.a, s.r, s.g, s.b), (24, 16, 8, 0));
    let s = PixelFormat::B8G8R8A8.shifts();
    assert_eq!((s.a, s.r, s.g, s.b), (0, 8, 16, 24));
    let s = PixelFormat::R8G8B8A8.shifts();
    assert_eq!((s.a, s.r, s.g, s.b), (0, 24, 16, 8));
    let s = PixelFormat::B5G6R5.shifts();
    assert_eq!((s.r, s.g, s.b), (0, 5, 11));
}
