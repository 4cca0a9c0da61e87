use crate::error::Result;
use crate::table::RecordTable;

/// NYC service-area bounding box. Rows outside it carry improper geolocation.
pub const NYC_LONGITUDE_RANGE: (f64, f64) = (-74.25, -73.50);
pub const NYC_LATITUDE_RANGE: (f64, f64) = (40.5, 41.2);

/// Outcome of one filter pass over the table.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub rows_dropped: usize,
    pub rows_remaining: usize,
}

/// A single in-place row-filtering pass.
pub trait RowFilter {
    fn name(&self) -> &'static str;

    fn apply(&self, table: &mut RecordTable) -> Result<FilterOutcome>;
}

/// Keeps rows whose `price` lies inside the configured band, bounds
/// inclusive.
pub struct PriceBand {
    pub min_price: f64,
    pub max_price: f64,
}

impl RowFilter for PriceBand {
    fn name(&self) -> &'static str {
        "price_band"
    }

    fn apply(&self, table: &mut RecordTable) -> Result<FilterOutcome> {
        let price_idx = table.column_index("price")?;
        let (min, max) = (self.min_price, self.max_price);
        let rows_dropped = table.retain_rows(|row| {
            match RecordTable::numeric_cell(row, price_idx) {
                Some(price) => price >= min && price <= max,
                None => false,
            }
        });
        Ok(FilterOutcome {
            rows_dropped,
            rows_remaining: table.len(),
        })
    }
}

/// Removes exact-duplicate rows, first occurrence wins.
pub struct ExactDuplicates;

impl RowFilter for ExactDuplicates {
    fn name(&self) -> &'static str {
        "exact_duplicates"
    }

    fn apply(&self, table: &mut RecordTable) -> Result<FilterOutcome> {
        let rows_dropped = table.dedup_exact();
        Ok(FilterOutcome {
            rows_dropped,
            rows_remaining: table.len(),
        })
    }
}

/// Keeps rows whose coordinates fall inside a bounding box, bounds inclusive.
pub struct GeoBounds {
    longitude: (f64, f64),
    latitude: (f64, f64),
}

impl GeoBounds {
    pub fn new(longitude: (f64, f64), latitude: (f64, f64)) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// The box this pipeline serves
    pub fn nyc() -> Self {
        Self::new(NYC_LONGITUDE_RANGE, NYC_LATITUDE_RANGE)
    }
}

impl RowFilter for GeoBounds {
    fn name(&self) -> &'static str {
        "geo_bounds"
    }

    fn apply(&self, table: &mut RecordTable) -> Result<FilterOutcome> {
        let lon_idx = table.column_index("longitude")?;
        let lat_idx = table.column_index("latitude")?;
        let (lon, lat) = (self.longitude, self.latitude);
        let rows_dropped = table.retain_rows(|row| {
            let in_lon = matches!(
                RecordTable::numeric_cell(row, lon_idx),
                Some(v) if v >= lon.0 && v <= lon.1
            );
            let in_lat = matches!(
                RecordTable::numeric_cell(row, lat_idx),
                Some(v) if v >= lat.0 && v <= lat.1
            );
            in_lon && in_lat
        });
        Ok(FilterOutcome {
            rows_dropped,
            rows_remaining: table.len(),
        })
    }
}
