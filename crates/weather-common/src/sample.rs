//! Hourly weather observations.
//!
//! A [`WeatherSeries`] is stored column-wise so that a column the upstream
//! source did not deliver can be represented as absent, which is different
//! from a column that merely contains bad (NaN) readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{WeatherError, WeatherResult};

/// One observation row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub timestamp: DateTime<Utc>,
    /// Air temperature (°C)
    pub temperature: f32,
    /// Relative humidity (%)
    pub humidity: f32,
    /// Wind speed (m/s)
    pub wind_speed: f32,
    /// Cloud cover (%)
    pub cloud_cover: f32,
}

/// The four observed quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Temperature,
    Humidity,
    WindSpeed,
    CloudCover,
}

impl Column {
    pub const ALL: [Column; 4] = [
        Column::Temperature,
        Column::Humidity,
        Column::WindSpeed,
        Column::CloudCover,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Column::Temperature => "temperature",
            Column::Humidity => "humidity",
            Column::WindSpeed => "wind_speed",
            Column::CloudCover => "cloud_cover",
        }
    }

    fn index(&self) -> usize {
        match self {
            Column::Temperature => 0,
            Column::Humidity => 1,
            Column::WindSpeed => 2,
            Column::CloudCover => 3,
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered, validated sequence of hourly observations.
///
/// Invariants (checked on construction):
/// - at least one timestamp
/// - timestamps strictly increasing (no duplicates)
/// - every present column has exactly one value per timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct WeatherSeries {
    timestamps: Vec<DateTime<Utc>>,
    #[serde(serialize_with = "nan_column::serialize")]
    columns: [Option<Vec<f32>>; 4],
}

impl WeatherSeries {
    /// Build a series from timestamps and the four columns in
    /// [`Column::ALL`] order. `None` marks a column as absent.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        columns: [Option<Vec<f32>>; 4],
    ) -> WeatherResult<Self> {
        if timestamps.is_empty() {
            return Err(WeatherError::EmptySeries);
        }

        if let Some(index) = timestamps
            .windows(2)
            .position(|pair| pair[1] <= pair[0])
        {
            return Err(WeatherError::UnorderedTimestamps { index: index + 1 });
        }

        for column in Column::ALL {
            if let Some(values) = &columns[column.index()] {
                if values.len() != timestamps.len() {
                    return Err(WeatherError::ColumnLength {
                        column: column.name(),
                        expected: timestamps.len(),
                        actual: values.len(),
                    });
                }
            }
        }

        Ok(Self {
            timestamps,
            columns,
        })
    }

    /// Build a series from rows in arbitrary order.
    ///
    /// Rows are sorted by timestamp and duplicate timestamps are dropped,
    /// keeping the first occurrence in input order.
    pub fn from_unordered(
        timestamps: Vec<DateTime<Utc>>,
        columns: [Option<Vec<f32>>; 4],
    ) -> WeatherResult<Self> {
        for column in Column::ALL {
            if let Some(values) = &columns[column.index()] {
                if values.len() != timestamps.len() {
                    return Err(WeatherError::ColumnLength {
                        column: column.name(),
                        expected: timestamps.len(),
                        actual: values.len(),
                    });
                }
            }
        }

        // Stable sort keeps the first of equal timestamps in front.
        let mut order: Vec<usize> = (0..timestamps.len()).collect();
        order.sort_by_key(|&i| timestamps[i]);
        order.dedup_by_key(|i| timestamps[*i]);

        let sorted_timestamps = order.iter().map(|&i| timestamps[i]).collect();
        let sorted_columns = columns.map(|column| {
            column.map(|values| order.iter().map(|&i| values[i]).collect())
        });

        Self::new(sorted_timestamps, sorted_columns)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Always false for a constructed series; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn first_timestamp(&self) -> DateTime<Utc> {
        self.timestamps[0]
    }

    pub fn last_timestamp(&self) -> DateTime<Utc> {
        self.timestamps[self.timestamps.len() - 1]
    }

    /// Values of a column, or `None` if the source did not provide it.
    pub fn column(&self, column: Column) -> Option<&[f32]> {
        self.columns[column.index()].as_deref()
    }

    /// Copy of this series with one column removed.
    pub fn without(&self, column: Column) -> Self {
        let mut copy = self.clone();
        copy.columns[column.index()] = None;
        copy
    }

    /// Row `index`; absent columns read as NaN.
    pub fn sample(&self, index: usize) -> Option<WeatherSample> {
        let timestamp = *self.timestamps.get(index)?;
        let value = |column: Column| {
            self.column(column)
                .map(|values| values[index])
                .unwrap_or(f32::NAN)
        };
        Some(WeatherSample {
            timestamp,
            temperature: value(Column::Temperature),
            humidity: value(Column::Humidity),
            wind_speed: value(Column::WindSpeed),
            cloud_cover: value(Column::CloudCover),
        })
    }

    /// Names of the columns that are absent.
    pub fn missing_columns(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|c| self.column(*c).is_none())
            .collect()
    }
}

/// Wire form of a series; NaN readings travel as `null`.
#[derive(Deserialize)]
struct RawSeries {
    timestamps: Vec<DateTime<Utc>>,
    #[serde(default)]
    columns: [Option<Vec<Option<f32>>>; 4],
}

impl TryFrom<RawSeries> for WeatherSeries {
    type Error = WeatherError;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        let columns = raw.columns.map(|column| {
            column.map(|values| values.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
        });
        WeatherSeries::new(raw.timestamps, columns)
    }
}

mod nan_column {
    use serde::ser::SerializeSeq;
    use serde::Serializer;

    pub fn serialize<S>(columns: &[Option<Vec<f32>>; 4], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(columns.len()))?;
        for column in columns {
            let values: Option<Vec<Option<f32>>> = column.as_ref().map(|values| {
                values
                    .iter()
                    .map(|v| if v.is_finite() { Some(*v) } else { None })
                    .collect()
            });
            seq.serialize_element(&values)?;
        }
        seq.end()
    }
}
