//! Onset detection modules
//!
//! Onsets feed the tempo estimate:
//! - Energy flux (positive RMS rise between centered frames)

pub mod energy_flux;
