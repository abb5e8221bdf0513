// Domain-layer modules and shared errors/models
pub mod eligibility {
    pub use crate::eligibility::*;
}

pub mod lifecycle {
    pub use crate::lifecycle::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod services {
    pub use crate::services::*;
}

pub mod errors {
    pub use crate::errors::*;
}
