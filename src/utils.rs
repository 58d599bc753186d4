//! Module for small utilities which are used across other modules.
use core::ops::{Add, Mul};
use num_traits::real::Real;

/// Linear interpolation of the two values given.
pub fn lerp<T, R>(first: T, second: T, factor: R) -> T
where
    T: Add<Output = T> + Mul<R, Output = T>,
    R: Real,
{
    first * (R::one() - factor) + second * factor
}

/// Find the smallest index for which the corresponding element is strictly bigger
/// than the element given.
/// We assume that the collection is ordered, to use binary search.
/// If all elements are smaller or equal, the length of the collection is returned.
///
/// # Examples
///
/// ```
/// # use tubular::utils::strict_upper_bound;
/// let arr = [0.0, 0.1, 0.2, 0.7, 0.7, 0.7, 0.8, 1.0];
/// assert_eq!(strict_upper_bound(&arr, -1.0), 0);
/// assert_eq!(strict_upper_bound(&arr, 0.15), 2);
/// assert_eq!(strict_upper_bound(&arr, 0.7), 6);
/// assert_eq!(strict_upper_bound(&arr, 20.0), 8);
/// ```
pub fn strict_upper_bound<T>(collection: &[T], element: T) -> usize
where
    T: PartialOrd + Copy,
{
    let mut pointer = 0;
    let mut count = collection.len();
    while count > 0 {
        let step = count / 2;
        let sample = pointer + step;
        if element >= collection[sample] {
            pointer = sample + 1;
            count -= step + 1;
        } else {
            count = step;
        }
    }
    pointer
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lerp_endpoints() {
        assert_f64_near!(lerp(2.0, 6.0, 0.0), 2.0);
        assert_f64_near!(lerp(2.0, 6.0, 1.0), 6.0);
        assert_f64_near!(lerp(2.0, 6.0, 0.5), 4.0);
    }

    #[test]
    fn upper_bound_single_element() {
        let arr = [5.0];
        assert_eq!(strict_upper_bound(&arr, 0.5), 0);
        assert_eq!(strict_upper_bound(&arr, 5.0), 1);
    }
}
