//! git::revspec
//!
//! Parser for relative revision suffixes.
//!
//! A revision is a base name followed by any chain of navigation steps:
//!
//! - `~N` walks N first parents back (`~` alone means `~1`)
//! - `^N` selects the N-th parent (`^` alone means `^1`, `^0` is the commit
//!   itself)
//!
//! `main~2^2~1` is therefore "two first-parents back from `main`, then its
//! second parent, then one more first-parent". Branch names cannot contain
//! `~` or `^`, so the first occurrence of either always ends the base name.

use super::GitError;

/// One navigation step after the base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// `~N`: follow the first parent N times.
    Ancestor(usize),
    /// `^N`: select the N-th parent (1-based); `^0` is a no-op.
    Parent(usize),
}

/// A parsed revision expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevSpec<'a> {
    /// Ref name or (possibly abbreviated) hash.
    pub base: &'a str,
    pub steps: Vec<Step>,
}

impl<'a> RevSpec<'a> {
    /// Parse a revision expression.
    ///
    /// `@` is accepted as shorthand for `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::InvalidRevision`] for an empty base or a suffix
    /// that is followed by something other than digits or another suffix.
    ///
    /// # Example
    ///
    /// ```
    /// use git_sim::git::revspec::{RevSpec, Step};
    ///
    /// let spec = RevSpec::parse("main~2^2").unwrap();
    /// assert_eq!(spec.base, "main");
    /// assert_eq!(spec.steps, vec![Step::Ancestor(2), Step::Parent(2)]);
    /// ```
    pub fn parse(input: &'a str) -> Result<Self, GitError> {
        let input = input.trim();
        let split = input.find(['~', '^']).unwrap_or(input.len());
        let (base, mut rest) = input.split_at(split);

        let base = match base {
            "" => return Err(invalid(input, "missing ref name before suffix")),
            "@" => "HEAD",
            other => other,
        };

        let mut steps = Vec::new();
        while let Some(marker) = rest.chars().next() {
            rest = &rest[marker.len_utf8()..];
            let digits_len = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            let (digits, tail) = rest.split_at(digits_len);
            let count = if digits.is_empty() {
                1
            } else {
                digits
                    .parse()
                    .map_err(|_| invalid(input, "suffix count out of range"))?
            };

            steps.push(match marker {
                '~' => Step::Ancestor(count),
                '^' => Step::Parent(count),
                _ => return Err(invalid(input, "unexpected characters after suffix")),
            });
            rest = tail;
        }

        Ok(Self { base, steps })
    }

    /// True when the expression is a bare name with no navigation.
    pub fn is_plain(&self) -> bool {
        self.steps.is_empty()
    }
}

fn invalid(spec: &str, message: &str) -> GitError {
    GitError::InvalidRevision {
        spec: spec.to_string(),
        message: message.to_string(),
    }
}
