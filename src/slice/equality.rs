use std::sync::Arc;

/// Cheap "same value" check used by the default [`Identity`] policy.
///
/// Shared handles compare by allocation, plain scalars by value. This
/// mirrors strict equality in dynamically typed stores: a field left alone
/// by a shallow merge is still identical afterwards, while a rebuilt
/// object is not, even if it holds the same data.
pub trait Identical {
    fn identical(&self, other: &Self) -> bool;
}

impl<T: ?Sized> Identical for Arc<T> {
    fn identical(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: Identical> Identical for Option<T> {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.identical(b),
            (None, None) => true,
            _ => false,
        }
    }
}

macro_rules! identical_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identical for $ty {
                #[inline]
                fn identical(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

identical_by_value!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, String,
    &'static str,
);

// Bit comparison: NaN matches itself, +0.0 and -0.0 differ.
macro_rules! identical_by_bits {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identical for $ty {
                #[inline]
                fn identical(&self, other: &Self) -> bool {
                    self.to_bits() == other.to_bits()
                }
            }
        )*
    };
}

identical_by_bits!(f32, f64);

macro_rules! identical_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Identical),+> Identical for ($($name,)+) {
            fn identical(&self, other: &Self) -> bool {
                $(self.$idx.identical(&other.$idx))&&+
            }
        }
    };
}

identical_tuple!(A: 0, B: 1);
identical_tuple!(A: 0, B: 1, C: 2);
identical_tuple!(A: 0, B: 1, C: 2, D: 3);

/// Policy deciding whether a freshly selected value counts as a change.
pub trait Equality<T>: Send + Sync + 'static {
    /// `true` when `next` should be treated as unchanged from `previous`.
    fn equals(&self, previous: &T, next: &T) -> bool;
}

/// Default policy: [`Identical`] comparison.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Identity;

impl<T: Identical> Equality<T> for Identity {
    fn equals(&self, previous: &T, next: &T) -> bool {
        previous.identical(next)
    }
}

/// Deep comparison through `PartialEq`.
///
/// Suits selectors that build a fresh value on every call, such as a
/// filtered `Vec`, where identity would report a change every time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Structural;

impl<T: PartialEq> Equality<T> for Structural {
    fn equals(&self, previous: &T, next: &T) -> bool {
        previous == next
    }
}

/// Caller-supplied comparison. Build one with [`by`].
#[derive(Clone, Copy)]
pub struct By<F>(F);

impl<T, F> Equality<T> for By<F>
where
    F: Fn(&T, &T) -> bool + Send + Sync + 'static,
{
    fn equals(&self, previous: &T, next: &T) -> bool {
        (self.0)(previous, next)
    }
}

/// Wrap a comparison function as an [`Equality`] policy.
///
/// ```
/// use slice_store::slice::{by, Equality};
///
/// let same_len = by(|a: &String, b: &String| a.len() == b.len());
/// assert!(same_len.equals(&"abc".to_string(), &"xyz".to_string()));
/// ```
pub fn by<T, F>(f: F) -> By<F>
where
    F: Fn(&T, &T) -> bool + Send + Sync + 'static,
{
    By(f)
}
