pub(crate) mod kmeanplusplus;
