mod common;

mod agreement;
mod routing;
