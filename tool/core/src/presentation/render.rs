// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Roster page rendering
//!
//! Renders a [`RosterView`] to HTML with Handlebars. Every value is
//! HTML-escaped by the default `{{ }}` expansion.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde::Serialize;

use crate::application::roster_service::RosterView;

const ROSTER_TEMPLATE_NAME: &str = "roster";
const ROSTER_TEMPLATE: &str = include_str!("../../templates/roster.hbs");

#[derive(Serialize)]
struct RosterPage<'a> {
    launch_id: &'a str,
    course: &'a str,
    members: Vec<&'a str>,
}

pub struct RosterRenderer {
    handlebars: Handlebars<'static>,
}

impl RosterRenderer {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars
            .register_template_string(ROSTER_TEMPLATE_NAME, ROSTER_TEMPLATE)
            .context("Invalid roster template")?;

        Ok(Self { handlebars })
    }

    pub fn render(&self, view: &RosterView) -> Result<String> {
        let page = RosterPage {
            launch_id: view.launch_id.as_str(),
            course: &view.membership.context.title,
            members: view.membership.member_names().collect(),
        };

        self.handlebars
            .render(ROSTER_TEMPLATE_NAME, &page)
            .context("Failed to render roster page")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::launch::LaunchId;
    use crate::domain::membership::{Member, MemberStatus, Membership, MembershipContext};

    fn view(names: &[&str]) -> RosterView {
        RosterView {
            launch_id: LaunchId::from("launch-42"),
            membership: Membership {
                context: MembershipContext {
                    id: "ctx-1".to_string(),
                    label: None,
                    title: "CMPT 101".to_string(),
                },
                members: names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| Member {
                        user_id: format!("u{}", i),
                        name: name.to_string(),
                        roles: vec![],
                        status: MemberStatus::Active,
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn test_render_roster() {
        let html = RosterRenderer::new().unwrap().render(&view(&["Alice", "Bob"])).unwrap();

        assert!(html.contains("Launch successful!"));
        assert!(html.contains("launch-42"));
        assert!(html.contains("CMPT 101"));
        let alice = html.find("<li>Alice</li>").unwrap();
        let bob = html.find("<li>Bob</li>").unwrap();
        assert!(alice < bob);
    }

    #[test]
    fn test_member_names_are_escaped() {
        let html = RosterRenderer::new()
            .unwrap()
            .render(&view(&["<script>alert(1)</script>"]))
            .unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_empty_roster_renders_empty_list() {
        let html = RosterRenderer::new().unwrap().render(&view(&[])).unwrap();
        assert!(!html.contains("<li>"));
    }
}
