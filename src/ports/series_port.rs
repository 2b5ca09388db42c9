//! Multiple time series provider port.

use crate::domain::error::ValuationError;
use crate::domain::multiple::Multiple;
use crate::domain::series::MultipleSeries;

/// Supplies a fully materialised series, or an error. Never a partial one.
pub trait MultipleSeriesPort {
    fn get_multiple_series(
        &self,
        symbol: &str,
        multiple: Multiple,
    ) -> Result<MultipleSeries, ValuationError>;
}
