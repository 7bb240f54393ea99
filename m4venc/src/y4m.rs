use crate::error::Y4mError;

/// Stream parameters from a YUV4MPEG2 header line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Y4mHeader {
    pub width: u32,
    pub height: u32,
    /// Frames per second, if the header carries an `F` field.
    pub framerate: Option<f64>,
}

/// One planar 4:2:0 picture.
#[derive(Debug, Clone)]
pub struct FramePixels {
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, Y4mError> {
    value.parse().map_err(|_| Y4mError::InvalidField {
        field,
        value: value.to_string(),
    })
}

fn parse_header(line: &str) -> Result<Y4mHeader, Y4mError> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("YUV4MPEG2") {
        return Err(Y4mError::BadSignature);
    }

    let mut width = None;
    let mut height = None;
    let mut framerate = None;
    for token in tokens {
        let Some((key, value)) = token.split_at_checked(1) else {
            continue;
        };
        match key {
            "W" => width = Some(parse_number::<u32>("W", value)?),
            "H" => height = Some(parse_number::<u32>("H", value)?),
            "F" => {
                let (num, den) = value.split_once(':').ok_or_else(|| Y4mError::InvalidField {
                    field: "F",
                    value: value.to_string(),
                })?;
                let num: f64 = parse_number("F", num)?;
                let den: f64 = parse_number("F", den)?;
                if den > 0.0 {
                    framerate = Some(num / den);
                }
            }
            "C" if !value.starts_with("420") => {
                return Err(Y4mError::UnsupportedColorspace(value.to_string()));
            }
            _ => {}
        }
    }

    let width = width.filter(|&w| w > 0).ok_or(Y4mError::MissingField("width"))?;
    let height = height.filter(|&h| h > 0).ok_or(Y4mError::MissingField("height"))?;
    Ok(Y4mHeader {
        width,
        height,
        framerate,
    })
}

/// Luma and per-chroma sample counts of a 4:2:0 picture.
fn plane_sizes(width: u32, height: u32) -> (usize, usize) {
    let y_size = width as usize * height as usize;
    let uv_size = width.div_ceil(2) as usize * height.div_ceil(2) as usize;
    (y_size, uv_size)
}

impl FramePixels {
    /// Parses the header and every frame of a Y4M stream.
    pub fn parse_y4m(data: &[u8]) -> Result<(Y4mHeader, Vec<Self>), Y4mError> {
        let header_end = data
            .iter()
            .position(|&b| b == b'\n')
            .ok_or(Y4mError::UnterminatedHeader)?;
        let header_line =
            std::str::from_utf8(&data[..header_end]).map_err(|_| Y4mError::BadSignature)?;
        let header = parse_header(header_line)?;

        let (width, height) = (header.width, header.height);
        let (y_size, uv_size) = plane_sizes(width, height);
        let frame_size = y_size + 2 * uv_size;

        let mut frames = Vec::new();
        let mut pos = header_end + 1;
        while data[pos..].starts_with(b"FRAME") {
            // frame headers may carry parameters before the newline
            let line_end = data[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .ok_or(Y4mError::TruncatedFrame {
                    index: frames.len(),
                })?;
            let start = pos + line_end + 1;
            if start + frame_size > data.len() {
                return Err(Y4mError::TruncatedFrame {
                    index: frames.len(),
                });
            }
            frames.push(Self {
                y: data[start..start + y_size].to_vec(),
                u: data[start + y_size..start + y_size + uv_size].to_vec(),
                v: data[start + y_size + uv_size..start + frame_size].to_vec(),
                width,
                height,
            });
            pos = start + frame_size;
        }
        Ok((header, frames))
    }

    pub fn all_from_y4m(data: &[u8]) -> Result<Vec<Self>, Y4mError> {
        Self::parse_y4m(data).map(|(_, frames)| frames)
    }

    pub fn all_from_y4m_file(path: &std::path::Path) -> Result<(Y4mHeader, Vec<Self>), Y4mError> {
        let data = std::fs::read(path)?;
        Self::parse_y4m(&data)
    }

    /// First frame of a Y4M stream.
    pub fn from_y4m(data: &[u8]) -> Result<Self, Y4mError> {
        let mut frames = Self::all_from_y4m(data)?;
        if frames.is_empty() {
            return Err(Y4mError::TruncatedFrame { index: 0 });
        }
        Ok(frames.swap_remove(0))
    }

    pub fn solid(width: u32, height: u32, y: u8, u: u8, v: u8) -> Self {
        let (y_size, uv_size) = plane_sizes(width, height);
        Self {
            y: vec![y; y_size],
            u: vec![u; uv_size],
            v: vec![v; uv_size],
            width,
            height,
        }
    }

    /// Builds a picture from a luma function, with flat mid-grey chroma.
    pub fn from_luma_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> Self {
        let mut frame = Self::solid(width, height, 0, 128, 128);
        for y in 0..height {
            for x in 0..width {
                frame.y[y as usize * width as usize + x as usize] = f(x, y);
            }
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_multi_frame_y4m(width: u32, height: u32, frame_values: &[(u8, u8, u8)]) -> Vec<u8> {
        let header = format!("YUV4MPEG2 W{} H{} F30:1 Ip C420jpeg\n", width, height);
        let mut data = header.into_bytes();
        let (y_size, uv_size) = plane_sizes(width, height);
        for &(y_val, u_val, v_val) in frame_values {
            data.extend_from_slice(b"FRAME\n");
            data.extend(vec![y_val; y_size]);
            data.extend(vec![u_val; uv_size]);
            data.extend(vec![v_val; uv_size]);
        }
        data
    }

    #[test]
    fn parse_solid_y4m() {
        let y4m = create_multi_frame_y4m(64, 64, &[(128, 128, 128)]);
        let pixels = FramePixels::from_y4m(&y4m).unwrap();
        assert_eq!(pixels.width, 64);
        assert_eq!(pixels.height, 64);
        assert_eq!(pixels.y.len(), 64 * 64);
        assert_eq!(pixels.u.len(), 32 * 32);
        assert!(pixels.y.iter().all(|&p| p == 128));
    }

    #[test]
    fn header_carries_framerate() {
        let y4m = b"YUV4MPEG2 W16 H16 F30000:1001 C420\n";
        let (header, frames) = FramePixels::parse_y4m(y4m).unwrap();
        assert!(frames.is_empty());
        assert_eq!((header.width, header.height), (16, 16));
        assert!((header.framerate.unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn parse_y4m_no_colorspace() {
        let mut data = b"YUV4MPEG2 W16 H16 F25:1\n".to_vec();
        data.extend_from_slice(b"FRAME\n");
        data.extend(vec![200u8; 16 * 16]);
        data.extend(vec![100u8; 8 * 8]);
        data.extend(vec![50u8; 8 * 8]);

        let pixels = FramePixels::from_y4m(&data).unwrap();
        assert!(pixels.y.iter().all(|&p| p == 200));
        assert!(pixels.u.iter().all(|&p| p == 100));
        assert!(pixels.v.iter().all(|&p| p == 50));
    }

    #[test]
    fn frame_parameters_are_skipped() {
        let mut data = b"YUV4MPEG2 W2 H2\n".to_vec();
        data.extend_from_slice(b"FRAME Ixyz\n");
        data.extend([1, 2, 3, 4, 5, 6]);
        let pixels = FramePixels::from_y4m(&data).unwrap();
        assert_eq!(pixels.y, vec![1, 2, 3, 4]);
        assert_eq!(pixels.u, vec![5]);
        assert_eq!(pixels.v, vec![6]);
    }

    #[test]
    fn parse_multi_frame_y4m() {
        let y4m =
            create_multi_frame_y4m(16, 16, &[(100, 110, 120), (130, 140, 150), (200, 210, 220)]);
        let frames = FramePixels::all_from_y4m(&y4m).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[1].u.iter().all(|&p| p == 140));
        assert!(frames[2].v.iter().all(|&p| p == 220));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn plane_sizes_do_not_wrap() {
        assert_eq!(plane_sizes(70_000, 70_000), (4_900_000_000, 1_225_000_000));
        assert_eq!(plane_sizes(u32::MAX, 2), (2 * u32::MAX as usize, 1 << 31));
        assert_eq!(plane_sizes(5, 3), (15, 6));
    }

    #[test]
    fn solid_constructor_matches_y4m() {
        let y4m = create_multi_frame_y4m(64, 64, &[(81, 91, 81)]);
        let from_y4m = FramePixels::from_y4m(&y4m).unwrap();
        let from_solid = FramePixels::solid(64, 64, 81, 91, 81);
        assert_eq!(from_y4m.y, from_solid.y);
        assert_eq!(from_y4m.u, from_solid.u);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            FramePixels::all_from_y4m(b"RIFF W16 H16\n"),
            Err(Y4mError::BadSignature)
        ));
        assert!(matches!(
            FramePixels::all_from_y4m(b"YUV4MPEG2 W16 H16"),
            Err(Y4mError::UnterminatedHeader)
        ));
        assert!(matches!(
            FramePixels::all_from_y4m(b"YUV4MPEG2 H16\n"),
            Err(Y4mError::MissingField("width"))
        ));
        assert!(matches!(
            FramePixels::all_from_y4m(b"YUV4MPEG2 W16 H16 C444\n"),
            Err(Y4mError::UnsupportedColorspace(_))
        ));
        assert!(matches!(
            FramePixels::all_from_y4m(b"YUV4MPEG2 Wabc H16\n"),
            Err(Y4mError::InvalidField { field: "W", .. })
        ));
    }

    #[test]
    fn truncated_frame_is_an_error() {
        let mut y4m = create_multi_frame_y4m(16, 16, &[(1, 2, 3), (4, 5, 6)]);
        y4m.truncate(y4m.len() - 10);
        assert!(matches!(
            FramePixels::all_from_y4m(&y4m),
            Err(Y4mError::TruncatedFrame { index: 1 })
        ));
    }
}
