use crate::error::{MusubiError, Result};
use crate::types::ArtifactKind;
use std::collections::HashMap;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Built-in document templates
// ---------------------------------------------------------------------------

const REQUIREMENTS_TEMPLATE: &str = "\
# {{FEATURE_NAME}} Requirements

**Project**: {{PROJECT_NAME}}
**Author**: {{AUTHOR}}
**Date**: {{DATE}}
**Component**: {{COMPONENT}}

## Introduction

Requirements for {{FEATURE_NAME}} in {{SYSTEM}}, written in EARS form.

## Functional Requirements

## Non-Functional Requirements
";

const DESIGN_TEMPLATE: &str = "\
# {{FEATURE_NAME}} Design

**Project**: {{PROJECT_NAME}}
**Author**: {{AUTHOR}}
**Date**: {{DATE}}

## Overview

C4-model design for {{FEATURE_NAME}}.

## Architecture Design

### Context

### Container

### Component

## Architecture Decisions
";

const TASKS_TEMPLATE: &str = "\
# {{FEATURE_NAME}} Tasks

**Project**: {{PROJECT_NAME}}
**Author**: {{AUTHOR}}
**Date**: {{DATE}}

## P0 Tasks

## P1 Tasks

## P2 Tasks
";

const CHANGE_TEMPLATE: &str = "\
# Change {{FEATURE_NAME}}

**Project**: {{PROJECT_NAME}}
**Author**: {{AUTHOR}}
**Date**: {{DATE}}

## Requirements Changes

### Added Requirements

### Modified Requirements

### Removed Requirements

### Renamed Requirements

## Impact Analysis

## Approval Checklist

- [ ] Impact reviewed
- [ ] Affected tests identified
- [ ] Approved by owner
";

fn builtin(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Requirements => REQUIREMENTS_TEMPLATE,
        ArtifactKind::Design => DESIGN_TEMPLATE,
        ArtifactKind::Tasks => TASKS_TEMPLATE,
        ArtifactKind::Changes => CHANGE_TEMPLATE,
    }
}

// ---------------------------------------------------------------------------
// TemplateSet
// ---------------------------------------------------------------------------

/// Template source for document creation. Built-in templates are compiled
/// into the crate; a custom directory, when configured, takes precedence and
/// must contain `<kind>.md` for every kind it is asked for.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    custom_dir: Option<PathBuf>,
}

impl TemplateSet {
    pub fn builtin_only() -> Self {
        Self::default()
    }

    pub fn with_custom_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            custom_dir: Some(dir.into()),
        }
    }

    pub fn get(&self, kind: ArtifactKind) -> Result<String> {
        if let Some(dir) = &self.custom_dir {
            let path = dir.join(format!("{kind}.md"));
            return crate::io::read_opt(&path)?
                .ok_or_else(|| MusubiError::TemplateMissing(kind.to_string()));
        }
        Ok(builtin(kind).to_string())
    }
}

/// Substitute `{{TOKEN}}` placeholders. Unknown tokens are left untouched.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}
