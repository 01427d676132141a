//! Comments, a rating of a note by a user

use uuid::Uuid;

use crate::choices::Choice;

/// Rating given to a note
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rating {
    /// No rating given (yet)
    #[default]
    WithoutRating,
    Terrible,
    Badly,
    Fine,
    Good,
    Excellent,
}

impl Choice for Rating {
    const ALL: &'static [Self] = &[
        Self::WithoutRating,
        Self::Terrible,
        Self::Badly,
        Self::Fine,
        Self::Good,
        Self::Excellent,
    ];

    fn value(self) -> i16 {
        match self {
            Self::WithoutRating => 0,
            Self::Terrible => 1,
            Self::Badly => 2,
            Self::Fine => 3,
            Self::Good => 4,
            Self::Excellent => 5,
        }
    }

    fn display(self) -> &'static str {
        match self {
            Self::WithoutRating => "Without rating",
            Self::Terrible => "Terrible",
            Self::Badly => "Badly",
            Self::Fine => "Fine",
            Self::Good => "Good",
            Self::Excellent => "Excellent",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Comment {
    pub id: i64,
    pub author_id: Uuid,
    pub note_id: i64,
    pub rating: Rating,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_values() {
        for (index, rating) in Rating::ALL.iter().enumerate() {
            assert_eq!(i16::try_from(index).unwrap(), rating.value());
            assert_eq!(Some(*rating), Rating::from_value(index as i64));
        }

        assert_eq!(None, Rating::from_value(6));
        assert_eq!("Without rating", Rating::default().display());
    }
}
