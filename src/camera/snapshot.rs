use image::{codecs::jpeg::JpegEncoder, RgbImage};

/// Encodes a frame as JPEG at its native resolution.
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, String> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err("frame has no pixels".to_string());
    }

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    frame
        .write_with_encoder(encoder)
        .map_err(|e| e.to_string())?;
    Ok(buffer)
}
