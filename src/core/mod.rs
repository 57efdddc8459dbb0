// Domain-layer modules and shared errors/models
pub mod rollup {
    pub use crate::rollup::*;
}

pub mod revenue {
    pub use crate::revenue::*;
}

pub mod intake {
    pub use crate::intake::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
