use std::str::FromStr;

use crate::error::IoError;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `%s`, replaced by the camera mark.
    Mark,
    /// `%d`, `%5d` or `%05d`, replaced by the frame index.
    Index { width: usize, zero_pad: bool },
}

/// A frame file-name template in printf notation, e.g. `"%s%05d.pgm"`.
///
/// The template is parsed once into typed segments. It must contain exactly
/// one index placeholder (`%d`, optionally with a width and zero padding);
/// `%s` placeholders receive the camera mark and `%%` is a literal percent.
///
/// # Example
///
/// ```
/// use rectify_io::FrameTemplate;
///
/// let template: FrameTemplate = "%s%05d.pgm".parse().unwrap();
///
/// assert_eq!(template.render("r", 2), "r00002.pgm");
/// assert_eq!(template.render("", 123456), "123456.pgm");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl FrameTemplate {
    /// Render the file name of a frame.
    pub fn render(&self, mark: &str, index: usize) -> String {
        let mut out = String::with_capacity(self.source.len() + mark.len() + 8);
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Mark => out.push_str(mark),
                Segment::Index {
                    width,
                    zero_pad: true,
                } => out.push_str(&format!("{index:0width$}")),
                Segment::Index {
                    width,
                    zero_pad: false,
                } => out.push_str(&format!("{index:width$}")),
            }
        }
        out
    }
}

impl FromStr for FrameTemplate {
    type Err = IoError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| IoError::InvalidTemplate(source.to_string(), reason.into());

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            let mut zero_pad = false;
            let mut digits = String::new();
            if chars.peek() == Some(&'0') {
                zero_pad = true;
                chars.next();
            }
            while let Some(d) = chars.next_if(|d| d.is_ascii_digit()) {
                digits.push(d);
            }

            let segment = match chars.next() {
                Some('%') if !zero_pad && digits.is_empty() => {
                    literal.push('%');
                    continue;
                }
                Some('s') if !zero_pad && digits.is_empty() => Segment::Mark,
                Some('d' | 'i' | 'u') => Segment::Index {
                    width: if digits.is_empty() {
                        0
                    } else {
                        digits.parse().map_err(|_| invalid("field width too large"))?
                    },
                    zero_pad,
                },
                Some(other) => return Err(invalid(&format!("unsupported conversion '%{other}'"))),
                None => return Err(invalid("dangling '%'")),
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(segment);
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let num_indices = segments
            .iter()
            .filter(|s| matches!(s, Segment::Index { .. }))
            .count();
        if num_indices != 1 {
            return Err(invalid("expected exactly one index placeholder"));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }
}

impl std::fmt::Display for FrameTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}
