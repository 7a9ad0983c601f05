//! A value of one of two possible types.
//!
//! `Either<L, R>` holds a `Left(L)` or a `Right(R)`. Unlike `Result`, neither
//! side carries an error connotation; the effect system uses it to report
//! which side of a race finished first.
//!
//! # Examples
//!
//! ```rust
//! use effectual::control::Either;
//!
//! let left: Either<i32, &str> = Either::Left(42);
//! assert!(left.is_left());
//! assert_eq!(left.left(), Some(42));
//! ```

/// A value that is either a `Left(L)` or a `Right(R)`.
///
/// # Type Parameters
///
/// * `L` - The type carried by the left case.
/// * `R` - The type carried by the right case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Either<L, R> {
    /// The left case.
    Left(L),
    /// The right case.
    Right(R),
}

impl<L, R> Either<L, R> {
    /// Returns `true` if this is a `Left`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::control::Either;
    ///
    /// let value: Either<i32, &str> = Either::Left(1);
    /// assert!(value.is_left());
    /// ```
    pub const fn is_left(&self) -> bool {
        matches!(self, Self::Left(_))
    }

    /// Returns `true` if this is a `Right`.
    pub const fn is_right(&self) -> bool {
        matches!(self, Self::Right(_))
    }

    /// Consumes the value and returns the left case, if present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::control::Either;
    ///
    /// let value: Either<i32, &str> = Either::Left(1);
    /// assert_eq!(value.left(), Some(1));
    ///
    /// let value: Either<i32, &str> = Either::Right("one");
    /// assert_eq!(value.left(), None);
    /// ```
    pub fn left(self) -> Option<L> {
        match self {
            Self::Left(value) => Some(value),
            Self::Right(_) => None,
        }
    }

    /// Consumes the value and returns the right case, if present.
    pub fn right(self) -> Option<R> {
        match self {
            Self::Left(_) => None,
            Self::Right(value) => Some(value),
        }
    }

    /// Transforms the left case, leaving a right case untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::control::Either;
    ///
    /// let value: Either<i32, &str> = Either::Left(20);
    /// assert_eq!(value.map_left(|x| x + 1), Either::Left(21));
    /// ```
    pub fn map_left<T, F>(self, function: F) -> Either<T, R>
    where
        F: FnOnce(L) -> T,
    {
        match self {
            Self::Left(value) => Either::Left(function(value)),
            Self::Right(value) => Either::Right(value),
        }
    }

    /// Transforms the right case, leaving a left case untouched.
    pub fn map_right<T, F>(self, function: F) -> Either<L, T>
    where
        F: FnOnce(R) -> T,
    {
        match self {
            Self::Left(value) => Either::Left(value),
            Self::Right(value) => Either::Right(function(value)),
        }
    }

    /// Collapses both cases into a single value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectual::control::Either;
    ///
    /// let value: Either<i32, &str> = Either::Right("hello");
    /// let length = value.fold(|n| n as usize, str::len);
    /// assert_eq!(length, 5);
    /// ```
    pub fn fold<T, F, G>(self, left_function: F, right_function: G) -> T
    where
        F: FnOnce(L) -> T,
        G: FnOnce(R) -> T,
    {
        match self {
            Self::Left(value) => left_function(value),
            Self::Right(value) => right_function(value),
        }
    }

    /// Swaps the two cases.
    pub fn swap(self) -> Either<R, L> {
        match self {
            Self::Left(value) => Either::Right(value),
            Self::Right(value) => Either::Left(value),
        }
    }
}
