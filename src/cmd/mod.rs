pub(crate) mod check;
pub(crate) mod encode;
pub(crate) mod resolve;
