use std::ops::Range;

/// Span in the original source (byte offsets, half-open).
pub type Span = Range<usize>;

/// A value annotated with its span.
pub type Spanned<T> = (T, Span);
