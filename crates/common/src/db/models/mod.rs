//! SeaORM entity models
//!
//! Database entities for the strain catalog

mod strain;

pub use strain::{
    Entity as StrainEntity,
    Model as Strain,
    ActiveModel as StrainActiveModel,
    Column as StrainColumn,
    GrowingDifficulty,
    NewStrain,
    StrainPatch,
    StrainType,
};
