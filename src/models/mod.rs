//! Model parameter sets and closed-form option kernels: Black, SABR with
//! right-tail extrapolation, Hull-White one-factor, and the displaced-diffusion
//! LIBOR market model.

pub mod black;
pub mod hull_white;
pub mod lmm;
pub mod sabr;
pub mod sabr_extrapolation;

pub use hull_white::HullWhiteOneFactor;
pub use lmm::LmmDisplacedDiffusion;
pub use sabr::{SabrParameters, SabrSurface, SabrVolatilityAdjoint};
pub use sabr_extrapolation::{SabrExtrapolationParameters, SabrExtrapolationRight};
