//! Backend row shapes and their conversion to domain types.
//!
//! Columns keep the backend's Spanish names. Loosely typed columns (ids
//! stored as strings, JSON stored as text) are read leniently.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use resistencia_domain::{
    Achievement, BranchOption, Character, CharacterId, InventoryItem, LocationId, MediaKind,
    MediaResource, NarrativeStep, PlayerProgression, ResourceId, Reward, RewardId, StepId,
    StepKind, Story, StoryId, UserId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::infrastructure::ports::{InteractionRecord, RepoError};

pub const STORY_TABLE: &str = "historia";
pub const STEP_TABLE: &str = "flujo_narrativo";
pub const MEDIA_TABLE: &str = "recursomultimedia";
pub const REWARD_TABLE: &str = "recompensa";
pub const CHARACTER_TABLE: &str = "personaje";
pub const PROGRESSION_TABLE: &str = "perfiles_jugador";
pub const INTERACTION_TABLE: &str = "interaccionusuario";

/// Reads an integer stored as a JSON number or a numeric string.
fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_u32(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

// =============================================================================
// historia
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct StoryRow {
    pub id_historia: i64,
    pub titulo: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub narrativa: Option<String>,
    #[serde(default)]
    pub id_historia_dependencia: Option<i64>,
    #[serde(default)]
    pub id_ubicacion: Option<i64>,
    #[serde(default)]
    pub id_imagen_historia: Option<i64>,
    #[serde(default)]
    pub orden: Option<i64>,
}

impl From<StoryRow> for Story {
    fn from(row: StoryRow) -> Self {
        let description = row.descripcion.or(row.narrativa).unwrap_or_default();
        Story {
            id: StoryId::new(row.id_historia),
            title: row.titulo,
            description,
            depends_on: row.id_historia_dependencia.map(StoryId::new),
            location: row.id_ubicacion.map(LocationId::new),
            cover_image: row.id_imagen_historia.map(ResourceId::new),
            order: to_u32(row.orden),
        }
    }
}

// =============================================================================
// flujo_narrativo
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct StepRow {
    pub id_flujo: i64,
    pub id_historia: i64,
    #[serde(default)]
    pub orden: Option<i64>,
    #[serde(default)]
    pub tipo_paso: Option<String>,
    #[serde(default)]
    pub contenido: Option<String>,
    #[serde(default)]
    pub recursomultimedia_id: Option<i64>,
    #[serde(default)]
    pub id_personaje: Option<i64>,
    #[serde(default)]
    pub id_recompensa: Option<i64>,
    #[serde(default)]
    pub id_siguiente_paso: Option<i64>,
    #[serde(default)]
    pub opciones_decision: Value,
}

impl TryFrom<StepRow> for NarrativeStep {
    type Error = RepoError;

    fn try_from(row: StepRow) -> Result<Self, Self::Error> {
        let kind = match row.tipo_paso.as_deref() {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(step_id = row.id_flujo, kind = raw, "Unknown step kind, treating as narrative");
                StepKind::Narrative
            }),
            None => StepKind::Narrative,
        };
        let branches = BranchOption::list_from_json(&row.opciones_decision)
            .map_err(|e| RepoError::serialization(format!("step {} branches: {}", row.id_flujo, e)))?;

        Ok(NarrativeStep {
            id: StepId::new(row.id_flujo),
            story_id: StoryId::new(row.id_historia),
            order: to_u32(row.orden).unwrap_or(0),
            kind,
            content: row.contenido,
            resource: row.recursomultimedia_id.map(ResourceId::new),
            character: row.id_personaje.map(CharacterId::new),
            reward: row.id_recompensa.map(RewardId::new),
            default_next: row.id_siguiente_paso.map(StepId::new),
            branches,
        })
    }
}

// =============================================================================
// recursomultimedia
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MediaRow {
    pub id_recurso: i64,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub archivo: Option<String>,
    #[serde(default)]
    pub metadatos: Value,
}

impl TryFrom<MediaRow> for MediaResource {
    type Error = RepoError;

    fn try_from(row: MediaRow) -> Result<Self, Self::Error> {
        let kind: MediaKind = row
            .tipo
            .as_deref()
            .ok_or_else(|| RepoError::serialization(format!("resource {} has no kind", row.id_recurso)))?
            .parse()
            .map_err(|e| RepoError::serialization(format!("resource {}: {}", row.id_recurso, e)))?;

        // Metadata is JSON text for the domain, whether stored as jsonb or text.
        let metadata = match row.metadatos {
            Value::Null => None,
            Value::String(raw) => Some(raw),
            other => Some(other.to_string()),
        };

        Ok(MediaResource {
            id: ResourceId::new(row.id_recurso),
            kind,
            url: row.archivo.unwrap_or_default(),
            metadata,
        })
    }
}

// =============================================================================
// recompensa / personaje
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RewardRow {
    pub id_recompensa: i64,
    pub nombre: String,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub valor: Option<i64>,
    #[serde(default)]
    pub id_historia: Option<i64>,
}

impl From<RewardRow> for Reward {
    fn from(row: RewardRow) -> Self {
        Reward {
            id: RewardId::new(row.id_recompensa),
            name: row.nombre,
            description: row.descripcion,
            kind: row.tipo,
            value: row.valor.unwrap_or(0),
            origin_story: row.id_historia.map(StoryId::new),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CharacterRow {
    pub id_personaje: i64,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub imagen: Option<String>,
    #[serde(default)]
    pub rol: Option<String>,
    #[serde(default)]
    pub id_historia: Option<i64>,
}

impl From<CharacterRow> for Character {
    fn from(row: CharacterRow) -> Self {
        Character {
            id: CharacterId::new(row.id_personaje),
            name: row.nombre,
            description: row.descripcion,
            image: row.imagen,
            role: row.rol,
            origin_story: row.id_historia.map(StoryId::new),
        }
    }
}

// =============================================================================
// perfiles_jugador
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRow {
    pub id: Value,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub valor: Option<i64>,
    #[serde(default)]
    pub cantidad: Option<u32>,
    #[serde(default)]
    pub fecha_obtencion: Option<DateTime<Utc>>,
    #[serde(default)]
    pub historia_origen: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionRow {
    pub user_id: Uuid,
    #[serde(default)]
    pub xp_total: Option<i64>,
    #[serde(default)]
    pub nivel: Option<u32>,
    #[serde(default)]
    pub inventario: Option<Vec<InventoryRow>>,
    /// Story ids, stored as numbers or numeric strings.
    #[serde(default)]
    pub historias_visitadas: Option<Vec<Value>>,
    /// Count only; the ids live in `historias_completadas_ids`.
    #[serde(default)]
    pub historias_completadas: Option<i64>,
    #[serde(default)]
    pub historias_completadas_ids: Option<Vec<Value>>,
    #[serde(default)]
    pub personajes_conocidos: Option<Vec<String>>,
    #[serde(default)]
    pub logros_desbloqueados: Option<Vec<String>>,
}

fn story_set(values: Option<Vec<Value>>) -> BTreeSet<StoryId> {
    values
        .unwrap_or_default()
        .iter()
        .filter_map(lenient_i64)
        .map(StoryId::new)
        .collect()
}

impl From<ProgressionRow> for PlayerProgression {
    fn from(row: ProgressionRow) -> Self {
        let user_id = UserId::from_uuid(row.user_id);
        let inventory = row
            .inventario
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                let Some(id) = lenient_i64(&entry.id) else {
                    tracing::warn!(user_id = %user_id, item = %entry.nombre, "Dropping inventory entry without a numeric reward id");
                    return None;
                };
                Some(InventoryItem {
                    reward_id: RewardId::new(id),
                    name: entry.nombre,
                    description: entry.descripcion,
                    kind: entry.tipo,
                    value: entry.valor.unwrap_or(0),
                    quantity: entry.cantidad.unwrap_or(1).max(1),
                    origin_story: lenient_i64(&entry.historia_origen).map(StoryId::new),
                    obtained_at: entry.fecha_obtencion.unwrap_or_default(),
                })
            })
            .collect();

        PlayerProgression {
            user_id,
            xp: row.xp_total.unwrap_or(0).max(0),
            visited: story_set(row.historias_visitadas),
            completed: story_set(row.historias_completadas_ids),
            known_characters: row.personajes_conocidos.unwrap_or_default().into_iter().collect(),
            inventory,
            achievements: row
                .logros_desbloqueados
                .unwrap_or_default()
                .iter()
                .filter_map(|code| Achievement::from_code(code))
                .collect(),
        }
    }
}

impl From<&PlayerProgression> for ProgressionRow {
    fn from(progression: &PlayerProgression) -> Self {
        let story_ids = |set: &BTreeSet<StoryId>| -> Vec<Value> {
            set.iter().map(|id| Value::from(id.as_i64())).collect()
        };
        ProgressionRow {
            user_id: progression.user_id.to_uuid(),
            xp_total: Some(progression.xp),
            nivel: Some(progression.level()),
            inventario: Some(
                progression
                    .inventory
                    .iter()
                    .map(|item| InventoryRow {
                        id: Value::from(item.reward_id.as_i64()),
                        nombre: item.name.clone(),
                        descripcion: item.description.clone(),
                        tipo: item.kind.clone(),
                        valor: Some(item.value),
                        cantidad: Some(item.quantity),
                        fecha_obtencion: Some(item.obtained_at),
                        historia_origen: item
                            .origin_story
                            .map(|id| Value::from(id.as_i64()))
                            .unwrap_or(Value::Null),
                    })
                    .collect(),
            ),
            historias_visitadas: Some(story_ids(&progression.visited)),
            historias_completadas: Some(progression.completed.len() as i64),
            historias_completadas_ids: Some(story_ids(&progression.completed)),
            personajes_conocidos: Some(progression.known_characters.iter().cloned().collect()),
            logros_desbloqueados: Some(
                progression
                    .achievements
                    .iter()
                    .map(|a| a.as_str().to_string())
                    .collect(),
            ),
        }
    }
}

// =============================================================================
// interaccionusuario
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct InteractionRow {
    pub user_id: Uuid,
    pub id_flujo: i64,
    pub tipo: &'static str,
    pub fecha_interaccion: DateTime<Utc>,
}

impl From<&InteractionRecord> for InteractionRow {
    fn from(record: &InteractionRecord) -> Self {
        InteractionRow {
            user_id: record.user_id.to_uuid(),
            id_flujo: record.step_id.as_i64(),
            tipo: record.kind.as_str(),
            fecha_interaccion: record.at,
        }
    }
}
