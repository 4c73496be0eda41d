use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DomainError, FileObject};

const FOLDER_KIND: &str = "folder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortType {
    /// Case-insensitive, digit runs compared by value.
    #[default]
    Name,
    NameCaseSensitive,
    NameCaseInsensitive,
    Extension,
    ModifiedDate,
    CreationDate,
    Size,
}

impl FromStr for SortType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "name" => Ok(Self::Name),
            "name_case_sensitive" | "case_sensitive" => Ok(Self::NameCaseSensitive),
            "name_case_insensitive" | "case_insensitive" => Ok(Self::NameCaseInsensitive),
            "extension" | "type" => Ok(Self::Extension),
            "modified_date" | "modified" => Ok(Self::ModifiedDate),
            "creation_date" | "created" => Ok(Self::CreationDate),
            "size" => Ok(Self::Size),
            other => Err(DomainError::InvalidPredicate(format!("unknown sort type: {other}"))),
        }
    }
}

/// Sorts `entries` in place.
///
/// With `directories_first` the directory group always comes first; `ascending`
/// only flips the order inside each group.
pub fn sort_entries(
    entries: &mut [FileObject],
    sort_type: SortType,
    ascending: bool,
    directories_first: bool,
) {
    entries.sort_by(|a, b| {
        if directories_first {
            let group = b.is_directory().cmp(&a.is_directory());
            if group != Ordering::Equal {
                return group;
            }
        }

        let ordering = compare_entries(a, b, sort_type);
        if ascending { ordering } else { ordering.reverse() }
    });
}

pub fn compare_entries(a: &FileObject, b: &FileObject, sort_type: SortType) -> Ordering {
    match sort_type {
        SortType::Name => natural_cmp(a.name(), b.name()).then_with(|| a.name().cmp(b.name())),
        SortType::NameCaseSensitive => a.name().cmp(b.name()),
        SortType::NameCaseInsensitive => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
        SortType::Extension => kind(a).cmp(&kind(b)),
        SortType::ModifiedDate => oldest_if_missing(a.modified_date())
            .cmp(&oldest_if_missing(b.modified_date())),
        SortType::CreationDate => oldest_if_missing(a.creation_date())
            .cmp(&oldest_if_missing(b.creation_date())),
        SortType::Size => a.size().cmp(&b.size()),
    }
}

fn kind(entry: &FileObject) -> String {
    if entry.is_directory() {
        FOLDER_KIND.to_string()
    } else {
        entry.extension().unwrap_or_default().to_lowercase()
    }
}

fn oldest_if_missing(date: Option<DateTime<Utc>>) -> DateTime<Utc> {
    date.unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Case-insensitive comparison that orders `file2` before `file10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().flat_map(char::to_lowercase).peekable();
    let mut right = b.chars().flat_map(char::to_lowercase).peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let ordering = compare_digit_runs(&take_digits(&mut left), &take_digits(&mut right));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                left.next();
                right.next();
                if l != r {
                    return l.cmp(&r);
                }
            }
        }
    }
}

fn take_digits<I: Iterator<Item = char>>(chars: &mut Peekable<I>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        run.push(c);
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_value = a.trim_start_matches('0');
    let b_value = b.trim_start_matches('0');

    a_value
        .len()
        .cmp(&b_value.len())
        .then_with(|| a_value.cmp(b_value))
        .then_with(|| a.len().cmp(&b.len()))
}
