use std::collections::VecDeque;

use semver::Version;

use pinion_types::Slug;

use crate::requirement::Requirement;

/// FIFO queue of open requirements.
#[derive(Debug, Default)]
pub struct RequirementQueue {
    queue: VecDeque<Requirement>,
}

impl RequirementQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, requirement: Requirement) {
        self.queue.push_back(requirement);
    }

    pub fn has_next(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn next(&mut self) -> Option<Requirement> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Point every queued requirement targeting `slug` at `version`, so
    /// pending requirements see a version change immediately.
    pub fn update_target_version(&mut self, slug: &Slug, version: &Version) {
        for requirement in &mut self.queue {
            if requirement.target.slug() == slug {
                requirement.target.set_version(version.clone());
            }
        }
    }

    /// Drop every queued requirement originating from `slug`.
    pub fn delete_source_requirements(&mut self, slug: &Slug) {
        self.queue
            .retain(|requirement| requirement.source_slug() != Some(slug));
    }
}
