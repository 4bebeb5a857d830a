//! Strain entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Strain classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum StrainType {
    #[sea_orm(string_value = "indica")]
    Indica,
    #[sea_orm(string_value = "sativa")]
    Sativa,
    #[sea_orm(string_value = "hybrid")]
    Hybrid,
}

impl StrainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrainType::Indica => "indica",
            StrainType::Sativa => "sativa",
            StrainType::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for StrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrainType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "indica" => Ok(StrainType::Indica),
            "sativa" => Ok(StrainType::Sativa),
            "hybrid" => Ok(StrainType::Hybrid),
            other => Err(format!("unknown strain type '{}'", other)),
        }
    }
}

/// How demanding a strain is to cultivate
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum GrowingDifficulty {
    #[sea_orm(string_value = "easy")]
    Easy,
    #[sea_orm(string_value = "moderate")]
    Moderate,
    #[sea_orm(string_value = "difficult")]
    Difficult,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "strains")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub strain_type: StrainType,

    #[sea_orm(column_type = "Text")]
    pub genetics: String,

    #[sea_orm(column_type = "Text")]
    pub breeder: String,

    #[sea_orm(column_type = "Text")]
    pub flowering_time: String,

    #[sea_orm(column_type = "Text")]
    pub yield_indoor: String,

    #[sea_orm(column_type = "Text")]
    pub yield_outdoor: String,

    #[sea_orm(column_type = "Text")]
    pub height_indoor: String,

    #[sea_orm(column_type = "Text")]
    pub height_outdoor: String,

    #[sea_orm(column_type = "Text")]
    pub thc_content: String,

    #[sea_orm(column_type = "Text")]
    pub cbd_content: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub effects: Vec<String>,

    pub flavors: Vec<String>,

    pub medical_uses: Vec<String>,

    #[sea_orm(nullable)]
    pub growing_difficulty: Option<GrowingDifficulty>,

    /// Natural dedup key for imports
    #[sea_orm(column_type = "Text", nullable, unique)]
    pub seedfinder_url: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True when the two sets share at least one element.
    fn overlaps(values: &[String], wanted: &[String]) -> bool {
        wanted.iter().any(|w| values.iter().any(|v| v == w))
    }

    pub fn has_any_effect(&self, wanted: &[String]) -> bool {
        Self::overlaps(&self.effects, wanted)
    }

    pub fn has_any_flavor(&self, wanted: &[String]) -> bool {
        Self::overlaps(&self.flavors, wanted)
    }
}

/// Payload for creating a strain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewStrain {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[serde(rename = "type")]
    pub strain_type: StrainType,

    #[serde(default)]
    pub genetics: String,
    #[serde(default)]
    pub breeder: String,
    #[serde(default)]
    pub flowering_time: String,
    #[serde(default)]
    pub yield_indoor: String,
    #[serde(default)]
    pub yield_outdoor: String,
    #[serde(default)]
    pub height_indoor: String,
    #[serde(default)]
    pub height_outdoor: String,
    #[serde(default)]
    pub thc_content: String,
    #[serde(default)]
    pub cbd_content: String,
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub flavors: Vec<String>,
    #[serde(default)]
    pub medical_uses: Vec<String>,

    #[serde(default)]
    pub growing_difficulty: Option<GrowingDifficulty>,

    #[serde(default)]
    #[validate(length(min = 1))]
    pub seedfinder_url: Option<String>,
}

impl NewStrain {
    /// Minimal payload; everything else starts empty
    pub fn new(name: impl Into<String>, strain_type: StrainType) -> Self {
        Self {
            name: name.into(),
            strain_type,
            genetics: String::new(),
            breeder: String::new(),
            flowering_time: String::new(),
            yield_indoor: String::new(),
            yield_outdoor: String::new(),
            height_indoor: String::new(),
            height_outdoor: String::new(),
            thc_content: String::new(),
            cbd_content: String::new(),
            description: String::new(),
            effects: Vec::new(),
            flavors: Vec::new(),
            medical_uses: Vec::new(),
            growing_difficulty: None,
            seedfinder_url: None,
        }
    }

    pub fn with_effects<I, S>(mut self, effects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.effects = effects.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_flavors<I, S>(mut self, flavors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flavors = flavors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_seedfinder_url(mut self, url: impl Into<String>) -> Self {
        self.seedfinder_url = Some(url.into());
        self
    }

    /// Materialize a stored record with the given identity and timestamps
    pub fn into_model(self, id: Uuid, now: DateTimeWithTimeZone) -> Model {
        Model {
            id,
            name: self.name,
            strain_type: self.strain_type,
            genetics: self.genetics,
            breeder: self.breeder,
            flowering_time: self.flowering_time,
            yield_indoor: self.yield_indoor,
            yield_outdoor: self.yield_outdoor,
            height_indoor: self.height_indoor,
            height_outdoor: self.height_outdoor,
            thc_content: self.thc_content,
            cbd_content: self.cbd_content,
            description: self.description,
            effects: self.effects,
            flavors: self.flavors,
            medical_uses: self.medical_uses,
            growing_difficulty: self.growing_difficulty,
            seedfinder_url: self.seedfinder_url,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; only present fields change
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct StrainPatch {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub strain_type: Option<StrainType>,
    pub genetics: Option<String>,
    pub breeder: Option<String>,
    pub flowering_time: Option<String>,
    pub yield_indoor: Option<String>,
    pub yield_outdoor: Option<String>,
    pub height_indoor: Option<String>,
    pub height_outdoor: Option<String>,
    pub thc_content: Option<String>,
    pub cbd_content: Option<String>,
    pub description: Option<String>,
    pub effects: Option<Vec<String>>,
    pub flavors: Option<Vec<String>>,
    pub medical_uses: Option<Vec<String>>,
    pub growing_difficulty: Option<GrowingDifficulty>,
    #[validate(length(min = 1))]
    pub seedfinder_url: Option<String>,
}

impl StrainPatch {
    /// Server-assigned keys a client may echo back from a fetched record
    pub const READ_ONLY_FIELDS: [&'static str; 3] = ["id", "created_at", "updated_at"];

    /// Parse a request body, dropping read-only keys first
    pub fn from_json(mut body: serde_json::Value) -> crate::errors::Result<Self> {
        if let Some(object) = body.as_object_mut() {
            for key in Self::READ_ONLY_FIELDS {
                object.remove(key);
            }
        }

        serde_json::from_value(body).map_err(|e| crate::errors::AppError::InvalidFormat {
            message: e.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &StrainPatch::default()
    }

    /// Apply to an in-memory record; the caller refreshes `updated_at`
    pub fn apply_to(self, strain: &mut Model) {
        macro_rules! assign {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(v) = self.$field { strain.$field = v; })+
            };
        }

        assign!(
            name, strain_type, genetics, breeder, flowering_time, yield_indoor,
            yield_outdoor, height_indoor, height_outdoor, thc_content, cbd_content,
            description, effects, flavors, medical_uses,
        );

        if let Some(difficulty) = self.growing_difficulty {
            strain.growing_difficulty = Some(difficulty);
        }
        if let Some(url) = self.seedfinder_url {
            strain.seedfinder_url = Some(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strain_type_round_trip_names() {
        for t in [StrainType::Indica, StrainType::Sativa, StrainType::Hybrid] {
            assert_eq!(t.as_str().parse::<StrainType>().unwrap(), t);
        }
        assert!("ruderalis".parse::<StrainType>().is_err());
    }

    #[test]
    fn test_new_strain_defaults_and_enum_guard() {
        let body = serde_json::json!({ "name": "Blue Dream", "type": "hybrid" });
        let strain: NewStrain = serde_json::from_value(body).unwrap();
        assert_eq!(strain.strain_type, StrainType::Hybrid);
        assert!(strain.effects.is_empty());
        assert_eq!(strain.growing_difficulty, None);

        let bad = serde_json::json!({ "name": "X", "type": "hybrid", "growing_difficulty": "trivial" });
        assert!(serde_json::from_value::<NewStrain>(bad).is_err());
    }

    #[test]
    fn test_empty_name_fails_validation() {
        let strain = NewStrain::new("", StrainType::Indica);
        assert!(strain.validate().is_err());
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let now = chrono::Utc::now().into();
        let mut model = NewStrain::new("Afghani", StrainType::Indica)
            .with_effects(["relaxed"])
            .into_model(Uuid::new_v4(), now);

        let patch: StrainPatch = serde_json::from_value(serde_json::json!({
            "breeder": "Sensi Seeds",
            "effects": ["sleepy", "happy"]
        }))
        .unwrap();
        assert!(!patch.is_empty());
        patch.apply_to(&mut model);

        assert_eq!(model.name, "Afghani");
        assert_eq!(model.breeder, "Sensi Seeds");
        assert_eq!(model.effects, vec!["sleepy", "happy"]);
        assert_eq!(model.strain_type, StrainType::Indica);
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        let res = StrainPatch::from_json(serde_json::json!({ "potency": "high" }));
        assert!(res.is_err());
    }

    #[test]
    fn test_patch_accepts_a_fetched_record() {
        let now = chrono::Utc::now().into();
        let model = NewStrain::new("Afghani", StrainType::Indica).into_model(Uuid::new_v4(), now);
        let mut body = serde_json::to_value(&model).unwrap();
        body["breeder"] = serde_json::json!("Sensi Seeds");

        let patch = StrainPatch::from_json(body).unwrap();
        assert_eq!(patch.breeder.as_deref(), Some("Sensi Seeds"));
        assert_eq!(patch.name.as_deref(), Some("Afghani"));

        let only_id = StrainPatch::from_json(serde_json::json!({ "id": "abc" })).unwrap();
        assert!(only_id.is_empty());
    }

    #[test]
    fn test_overlap_helpers() {
        let now = chrono::Utc::now().into();
        let model = NewStrain::new("A", StrainType::Indica)
            .with_effects(["relaxed", "happy"])
            .with_flavors(["pine"])
            .into_model(Uuid::new_v4(), now);

        assert!(model.has_any_effect(&["happy".to_string(), "energetic".to_string()]));
        assert!(!model.has_any_effect(&["energetic".to_string()]));
        assert!(model.has_any_flavor(&["pine".to_string()]));
    }
}
