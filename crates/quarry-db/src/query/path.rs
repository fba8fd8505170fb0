//! Relation-path parsing.
//!
//! A relation path is a string of segments separated by `.` (INNER join hop)
//! or `__` (LEFT join hop). The terminal segment names a column, a forward
//! relation, or a reverse relation; every earlier segment must name a
//! relation on the model reached so far.

use quarry_core::{QuarryError, QuarryResult};

use super::join_tree::JoinKind;

/// One parsed segment of a relation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSeg {
    /// The field, column, or relation name.
    pub name: String,
    /// The join into the next segment; `None` on the terminal segment.
    pub join: Option<JoinKind>,
}

/// Splits a relation path into segments, in source order.
///
/// `model` is only used to tag errors.
///
/// # Examples
///
/// ```
/// use quarry_db::query::{split_path, JoinKind};
///
/// let segs = split_path("Customer", "order.is_paid").unwrap();
/// assert_eq!(segs.len(), 2);
/// assert_eq!(segs[0].join, Some(JoinKind::Inner));
/// assert_eq!(segs[1].join, None);
/// ```
pub fn split_path(model: &str, raw: &str) -> QuarryResult<Vec<PathSeg>> {
    let arg_err = |message: String| QuarryError::ArgumentType {
        model: model.to_string(),
        message,
    };
    if raw.is_empty() {
        return Err(arg_err("empty field name".to_string()));
    }

    let mut segs = Vec::new();
    let mut rest = raw;
    loop {
        let (idx, join, skip) = match (rest.find('.'), rest.find("__")) {
            (None, None) => break,
            (Some(d), None) => (d, JoinKind::Inner, 1),
            (None, Some(u)) => (u, JoinKind::Left, 2),
            (Some(d), Some(u)) => {
                if d < u {
                    (d, JoinKind::Inner, 1)
                } else {
                    (u, JoinKind::Left, 2)
                }
            }
        };
        let name = &rest[..idx];
        if name.is_empty() {
            return Err(arg_err(format!("empty segment in path '{raw}'")));
        }
        segs.push(PathSeg {
            name: name.to_string(),
            join: Some(join),
        });
        rest = &rest[idx + skip..];
    }

    if rest.is_empty() {
        return Err(arg_err(format!("empty segment in path '{raw}'")));
    }
    segs.push(PathSeg {
        name: rest.to_string(),
        join: None,
    });
    Ok(segs)
}
