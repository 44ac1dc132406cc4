//! Path lookups over KML documents.
//!
//! The document is streamed once with `quick-xml`. Each requested path is a
//! sequence of element local names starting at the document root; namespace
//! prefixes are ignored. A lookup succeeds only when the path matches exactly
//! one element and that element holds text (no child elements).

use std::fmt;
use std::io::BufRead;

use quick_xml::errors::IllFormedError;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Element path of the placemark coordinates.
pub const COORDINATES_PATH: &[&str] = &["kml", "Document", "Placemark", "Point", "coordinates"];

/// Element path of the placemark description.
pub const DESCRIPTION_PATH: &[&str] = &["kml", "Document", "Placemark", "description"];

/// Element path of the placemark name.
pub const NAME_PATH: &[&str] = &["kml", "Document", "Placemark", "name"];

/// Why a path did not resolve to a single scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupFailure {
    /// No element at the path.
    Missing,
    /// More than one element at the path.
    Ambiguous {
        /// Number of matching elements.
        count: usize,
    },
    /// The element contains child elements instead of plain text.
    NotScalar,
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "not present"),
            Self::Ambiguous { count } => write!(f, "{count} matching elements"),
            Self::NotScalar => write!(f, "element has child elements"),
        }
    }
}

#[derive(Debug, Default)]
struct Capture {
    matches: usize,
    nested: bool,
    text: String,
}

impl Capture {
    fn into_value(self) -> Result<String, LookupFailure> {
        match self.matches {
            0 => Err(LookupFailure::Missing),
            1 if self.nested => Err(LookupFailure::NotScalar),
            1 => Ok(self.text),
            count => Err(LookupFailure::Ambiguous { count }),
        }
    }
}

/// Resolves every path in `paths` against the document read from `reader`.
///
/// The returned vector has one entry per requested path, in the same order.
/// Scalar text is the concatenation of the element's text and CDATA content
/// with entities unescaped, untrimmed. A self-closing element yields an empty
/// string.
///
/// # Errors
///
/// Returns the `quick-xml` error if the document is not well-formed,
/// including a document that ends before every element is closed.
pub fn lookup_paths<R: BufRead>(
    reader: R,
    paths: &[&[&str]],
) -> Result<Vec<Result<String, LookupFailure>>, quick_xml::Error> {
    let mut reader = Reader::from_reader(reader);
    let mut captures: Vec<Capture> = paths.iter().map(|_| Capture::default()).collect();
    let mut stack: Vec<String> = Vec::new();
    // Index into `paths` of the element currently being captured, if any.
    let mut active: Option<usize> = None;
    let mut buf = Vec::with_capacity(4096);

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(name);
                match active {
                    Some(index) => captures[index].nested = true,
                    None => {
                        if let Some(index) = matching_path(paths, &stack) {
                            captures[index].matches += 1;
                            captures[index].text.clear();
                            active = Some(index);
                        }
                    }
                }
            }
            Event::Empty(ref e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match active {
                    Some(index) => captures[index].nested = true,
                    None => {
                        stack.push(name);
                        if let Some(index) = matching_path(paths, &stack) {
                            captures[index].matches += 1;
                            captures[index].text.clear();
                        }
                        stack.pop();
                    }
                }
            }
            Event::Text(ref e) => {
                if let Some(index) = active {
                    captures[index].text.push_str(&e.unescape()?);
                }
            }
            Event::CData(ref e) => {
                if let Some(index) = active {
                    captures[index].text.push_str(&String::from_utf8_lossy(&**e));
                }
            }
            Event::End(_) => {
                if active.is_some_and(|index| stack.len() == paths[index].len()) {
                    active = None;
                }
                stack.pop();
            }
            Event::Eof => {
                // The reader does not reject a document that ends inside an element.
                if let Some(open) = stack.pop() {
                    return Err(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(
                        open,
                    )));
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(captures.into_iter().map(Capture::into_value).collect())
}

fn matching_path(paths: &[&[&str]], stack: &[String]) -> Option<usize> {
    paths.iter().position(|path| {
        path.len() == stack.len() && path.iter().zip(stack).all(|(want, have)| *want == have)
    })
}
