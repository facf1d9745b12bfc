//! # 증빙 정책(Proof Policy)
//!
//! 카테고리 ID → (증빙 필수 여부, 메모 필수 여부)를 판정하는 순수 함수 모음입니다.
//! 타이머 엔진은 이 정책을 보지 않습니다. 증빙과 메모는 stop 이후, 제출 전까지
//! 언제든 붙일 수 있기 때문에 제출 검증에서만 사용됩니다.

use crate::models::{Category, IssueKind, TimeEntry, ValidationIssue};
use std::collections::HashMap;

/// 카테고리 하나의 요구 사항
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProofRule {
    pub requires_proof: bool,
    pub requires_notes: bool,
}

/// 카테고리별 요구 사항 표. 등록되지 않은 카테고리는 아무것도 요구하지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct ProofPolicy {
    rules: HashMap<String, ProofRule>,
}

impl ProofPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_categories(categories: &[Category]) -> Self {
        let rules = categories
            .iter()
            .map(|c| {
                (
                    c.id.clone(),
                    ProofRule {
                        requires_proof: c.requires_proof,
                        requires_notes: c.requires_notes,
                    },
                )
            })
            .collect();
        Self { rules }
    }

    pub fn with_rule(mut self, category_id: impl Into<String>, rule: ProofRule) -> Self {
        self.rules.insert(category_id.into(), rule);
        self
    }

    pub fn requires_proof(&self, category_id: &str) -> bool {
        self.rules
            .get(category_id)
            .is_some_and(|rule| rule.requires_proof)
    }

    pub fn requires_notes(&self, category_id: &str) -> bool {
        self.rules
            .get(category_id)
            .is_some_and(|rule| rule.requires_notes)
    }

    /// 엔트리 하나가 정책을 어기는 항목을 모두 돌려줍니다.
    pub fn check_entry(&self, entry: &TimeEntry) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.requires_proof(&entry.category_id) && !entry.has_proof {
            issues.push(ValidationIssue::for_entry(
                IssueKind::MissingProof,
                &entry.id,
                format!(
                    "Entry on {} for project {} requires proof of work",
                    entry.date, entry.project_id
                ),
            ));
        }

        if self.requires_notes(&entry.category_id) && entry.description.trim().is_empty() {
            issues.push(ValidationIssue::for_entry(
                IssueKind::MissingNotes,
                &entry.id,
                format!(
                    "Entry on {} for project {} requires a description",
                    entry.date, entry.project_id
                ),
            ));
        }

        issues
    }
}
