//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Quantities and unit configurations are value objects: two `Quantity`
/// values with the same combined and split figures are interchangeable, and
/// "changing" one means building a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Weight { kg: f64 }
///
/// impl ValueObject for Weight {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
