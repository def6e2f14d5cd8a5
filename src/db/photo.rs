/// Photo record models
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// A catalogued photo: descriptive metadata plus the blob keys of its assets
///
/// Sync clients send `null` for unknown fields, which deserializes to the
/// field's default.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhotoRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    /// Blob key of the original image
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub thumbnail_path100: String,
    #[serde(deserialize_with = "null_as_default")]
    pub thumbnail_path350: String,
    #[serde(deserialize_with = "null_as_default")]
    pub star_rating: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(deserialize_with = "null_as_default")]
    pub area: String,
    #[serde(deserialize_with = "null_as_default")]
    pub locality: String,
    #[serde(deserialize_with = "null_as_default")]
    pub date_time_original: String,
    #[serde(deserialize_with = "null_as_default")]
    pub add_timestamp: String,
    #[serde(deserialize_with = "null_as_default")]
    pub lens_model: String,
    #[serde(deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(deserialize_with = "null_as_default")]
    pub exposure_time: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub f_number: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub focal_len_in35mm_film: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub focal_length: f64,
    #[serde(rename = "isoSPEEDRatings", deserialize_with = "null_as_default")]
    pub iso_speed_ratings: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub altitude: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub latitude: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub longitude: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub object_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub caption: String,
}

/// Which of a record's three assets a path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetRole {
    Original,
    Thumbnail100,
    Thumbnail350,
}

impl AssetRole {
    /// All roles, in the order they are checked and reported
    pub const ALL: [AssetRole; 3] = [
        AssetRole::Original,
        AssetRole::Thumbnail100,
        AssetRole::Thumbnail350,
    ];
}

impl PhotoRecord {
    /// Blob key recorded for an asset role, or `None` when the path is unset
    pub fn asset_path(&self, role: AssetRole) -> Option<&str> {
        let path = match role {
            AssetRole::Original => &self.path,
            AssetRole::Thumbnail100 => &self.thumbnail_path100,
            AssetRole::Thumbnail350 => &self.thumbnail_path350,
        };

        if path.is_empty() {
            None
        } else {
            Some(path.as_str())
        }
    }

    /// Every non-empty asset path, in role order
    pub fn referenced_paths(&self) -> Vec<&str> {
        AssetRole::ALL
            .iter()
            .filter_map(|role| self.asset_path(*role))
            .collect()
    }
}

/// Reduced projection served by the metadata endpoint
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMetadata {
    pub id: String,
    pub title: String,
    pub path: String,
    pub date_time_original: String,
    pub latitude: f64,
    pub longitude: f64,
    pub object_name: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
