//! Conversions from use-case results to wire responses.

use resistencia_domain::{xp_for_next_level, HotspotScene, PlayerProgression};
use resistencia_shared::{
    HotspotView, InventoryItemView, MediaView, PaintSessionResponse, PlaySessionResponse,
    ProgressionResponse, SceneView, StepView, StorySummary,
};

use crate::use_cases::{PaintView, PlayView, StoryEntry};

pub fn play_response(view: PlayView) -> PlaySessionResponse {
    let session = &view.session;
    let step = session.current_step();

    PlaySessionResponse {
        id: session.id().to_uuid(),
        story_id: session.story_id().as_i64(),
        state: session.state(),
        gate: session.gate(),
        ticket: session.ticket().value(),
        can_advance: session.can_advance(),
        step: StepView {
            id: step.id.as_i64(),
            order: step.order,
            kind: step.kind,
            content: step.content.clone(),
            choices: step.branches.iter().map(|b| b.label.clone()).collect(),
        },
        media: session.media().resource().map(|resource| MediaView {
            id: resource.id.as_i64(),
            kind: resource.kind,
            url: resource.url.clone(),
        }),
        scene: session
            .scene()
            .map(|scene| scene_view(scene, &view.language)),
        next_story: session.next_story().map(|s| s.as_i64()),
        app_init: view.app_init,
        events: view.events,
    }
}

fn scene_view(scene: &HotspotScene, language: &str) -> SceneView {
    SceneView {
        phase: scene.phase(),
        discovered: scene.discovered_count(),
        total: scene.total_regions(),
        highlighted: scene.highlighted().map(|m| m.as_str().to_string()),
        ambient_track: scene.ambient_track().map(str::to_string),
        hotspots: scene
            .registry()
            .regions()
            .iter()
            .map(|region| HotspotView {
                mesh_name: region.name.as_str().to_string(),
                content_type: region.content_type,
                title: region.localized_title(language).map(str::to_string),
                discovered: scene.is_discovered(region.name.as_str()),
            })
            .collect(),
    }
}

pub fn paint_response(view: PaintView) -> PaintSessionResponse {
    PaintSessionResponse {
        id: view.id.to_uuid(),
        status: view.status,
        progress_percent: view.progress_percent,
        paint_remaining: view.paint_remaining,
        cans: view.cans,
        seconds_left: view.seconds_left,
        brush_size: view.brush.diameter(),
        color: view.color.to_string(),
        orbit_enabled: view.orbit_enabled,
        texture_size: view.texture_size,
        result: view.result,
        events: view.events,
    }
}

pub fn story_summary(entry: StoryEntry) -> StorySummary {
    StorySummary {
        id: entry.story.id.as_i64(),
        title: entry.story.title,
        description: entry.story.description,
        depends_on: entry.story.depends_on.map(|s| s.as_i64()),
        locked: entry.locked,
        completed: entry.completed,
    }
}

pub fn progression_response(progression: PlayerProgression) -> ProgressionResponse {
    let level = progression.level();
    ProgressionResponse {
        user_id: progression.user_id.to_uuid(),
        xp: progression.xp,
        level,
        next_level_xp: xp_for_next_level(level),
        visited_stories: progression.visited.iter().map(|s| s.as_i64()).collect(),
        completed_stories: progression.completed.iter().map(|s| s.as_i64()).collect(),
        known_characters: progression.known_characters.into_iter().collect(),
        inventory: progression
            .inventory
            .into_iter()
            .map(|item| InventoryItemView {
                reward_id: item.reward_id.as_i64(),
                name: item.name,
                description: item.description,
                quantity: item.quantity,
            })
            .collect(),
        achievements: progression.achievements.into_iter().collect(),
    }
}
