//! Template stores.
//!
//! `JsonTemplateStore` keeps templates in a flat JSON file shaped
//! `{"templates": [...]}`; `MemoryTemplateStore` keeps them in process.
//! Both share the same insert/update/delete rules.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{extract_variables, Template, TemplateDraft, TemplateError, TemplateStore};
use crate::storage::JsonFile;

/// On-disk document layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    templates: Vec<Template>,
}

/// Next free `template_<n>` id, starting after the current count
fn next_template_id(templates: &[Template]) -> String {
    let mut n = templates.len() + 1;
    loop {
        let candidate = format!("template_{}", n);
        if !templates.iter().any(|t| t.id == candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn insert_into(templates: &mut Vec<Template>, draft: TemplateDraft) -> Result<Template, TemplateError> {
    draft.validate()?;

    let id = match draft.id {
        Some(id) => {
            if templates.iter().any(|t| t.id == id) {
                return Err(TemplateError::DuplicateId(id));
            }
            id
        }
        None => next_template_id(templates),
    };

    let now = Utc::now();
    let template = Template {
        id,
        variables: extract_variables(&draft.content),
        name: draft.name,
        content: draft.content,
        created_at: now,
        updated_at: now,
    };
    templates.push(template.clone());
    Ok(template)
}

fn update_in(
    templates: &mut [Template],
    id: &str,
    draft: TemplateDraft,
) -> Result<Option<Template>, TemplateError> {
    draft.validate()?;

    let Some(existing) = templates.iter_mut().find(|t| t.id == id) else {
        return Ok(None);
    };
    existing.variables = extract_variables(&draft.content);
    existing.name = draft.name;
    existing.content = draft.content;
    existing.updated_at = Utc::now();
    Ok(Some(existing.clone()))
}

fn delete_from(templates: &mut Vec<Template>, id: &str) -> bool {
    let before = templates.len();
    templates.retain(|t| t.id != id);
    templates.len() < before
}

/// Template store backed by a JSON file
#[derive(Debug)]
pub struct JsonTemplateStore {
    file: JsonFile,
}

impl JsonTemplateStore {
    /// Open (or lazily create) the store at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    fn load(&self) -> Result<Vec<Template>, TemplateError> {
        Ok(self.file.read::<TemplateFile, TemplateError>()?.templates)
    }

    fn modify<T>(
        &self,
        op: impl FnOnce(&mut Vec<Template>) -> Result<T, TemplateError>,
        changed: impl Fn(&T) -> bool,
    ) -> Result<T, TemplateError> {
        self.file
            .modify(|doc: &mut TemplateFile| op(&mut doc.templates), changed)
    }
}

impl TemplateStore for JsonTemplateStore {
    fn lookup(&self, id: &str) -> Result<Option<Template>, TemplateError> {
        Ok(self.load()?.into_iter().find(|t| t.id == id))
    }

    fn list(&self) -> Result<Vec<Template>, TemplateError> {
        self.load()
    }

    fn insert(&self, draft: TemplateDraft) -> Result<Template, TemplateError> {
        let template = self.modify(|templates| insert_into(templates, draft), |_| true)?;
        tracing::info!(template = %template.id, "template created");
        Ok(template)
    }

    fn update(&self, id: &str, draft: TemplateDraft) -> Result<Option<Template>, TemplateError> {
        self.modify(|templates| update_in(templates, id, draft), Option::is_some)
    }

    fn delete(&self, id: &str) -> Result<bool, TemplateError> {
        self.modify(|templates| Ok(delete_from(templates, id)), |removed| *removed)
    }
}

/// In-process template store
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: RwLock<Vec<Template>>,
}

impl MemoryTemplateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a template with a fixed id, replacing any existing one
    pub fn with_template(self, id: &str, content: &str) -> Self {
        {
            let mut templates = self.templates.write();
            delete_from(&mut templates, id);
            // Drafts built here always carry a name and an id.
            let draft = TemplateDraft::new(id, content).with_id(id);
            if let Err(e) = insert_into(&mut templates, draft) {
                tracing::warn!(template = %id, error = %e, "failed to seed template");
            }
        }
        self
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn lookup(&self, id: &str) -> Result<Option<Template>, TemplateError> {
        Ok(self.templates.read().iter().find(|t| t.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Template>, TemplateError> {
        Ok(self.templates.read().clone())
    }

    fn insert(&self, draft: TemplateDraft) -> Result<Template, TemplateError> {
        insert_into(&mut self.templates.write(), draft)
    }

    fn update(&self, id: &str, draft: TemplateDraft) -> Result<Option<Template>, TemplateError> {
        update_in(&mut self.templates.write(), id, draft)
    }

    fn delete(&self, id: &str) -> Result<bool, TemplateError> {
        Ok(delete_from(&mut self.templates.write(), id))
    }
}
