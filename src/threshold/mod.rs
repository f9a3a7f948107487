pub(crate) mod auto;
pub(crate) mod estimate;
