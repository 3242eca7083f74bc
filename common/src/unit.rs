//! Marker types distinguishing kinds of dates.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity termination.
#[derive(Clone, Copy, Debug)]
pub struct Termination;

/// Marker type describing a date something becomes due.
#[derive(Clone, Copy, Debug)]
pub struct Due;
