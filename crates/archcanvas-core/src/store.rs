use crate::error::{CanvasError, Result};
use crate::library::Library;
use crate::project::{Project, ProjectDraft};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::info;

#[derive(Debug, Default)]
struct Workspace {
    library: Library,
    projects: IndexMap<String, Project>,
    current: Option<String>,
}

/// Process-lifetime store for the libraries, the projects and the current
/// project selection. Nothing is written to disk.
#[derive(Debug, Default)]
pub struct CanvasStore {
    inner: RwLock<Workspace>,
}

impl CanvasStore {
    pub fn new(library: Library) -> Self {
        Self {
            inner: RwLock::new(Workspace {
                library,
                ..Default::default()
            }),
        }
    }

    pub fn seeded() -> Self {
        Self::new(Library::seeded())
    }

    pub fn read_library<R>(&self, f: impl FnOnce(&Library) -> R) -> R {
        f(&self.inner.read().library)
    }

    pub fn write_library<R>(&self, f: impl FnOnce(&mut Library) -> R) -> R {
        f(&mut self.inner.write().library)
    }

    /// Creates a project and makes it the current selection.
    pub fn create_project(&self, draft: ProjectDraft) -> Result<Project> {
        let project = Project::new(draft)?;
        let mut ws = self.inner.write();
        if ws.projects.contains_key(&project.name) {
            return Err(CanvasError::AlreadyExists {
                kind: "Project",
                id: project.name,
            });
        }
        ws.current = Some(project.name.clone());
        ws.projects.insert(project.name.clone(), project.clone());
        info!(project = %project.name, id = %project.id, "project created");
        Ok(project)
    }

    /// Inserts an already-built project, replacing one with the same name.
    pub fn insert_project(&self, project: Project) {
        let mut ws = self.inner.write();
        ws.projects.insert(project.name.clone(), project);
    }

    pub fn project(&self, name: &str) -> Result<Project> {
        self.inner
            .read()
            .projects
            .get(name)
            .cloned()
            .ok_or_else(|| CanvasError::not_found("Project", name))
    }

    pub fn list_projects(&self) -> Vec<Project> {
        self.inner.read().projects.values().cloned().collect()
    }

    pub fn delete_project(&self, name: &str) -> Result<Project> {
        let mut ws = self.inner.write();
        let removed = ws
            .projects
            .shift_remove(name)
            .ok_or_else(|| CanvasError::not_found("Project", name))?;
        if ws.current.as_deref() == Some(name) {
            ws.current = None;
        }
        info!(project = %name, "project deleted");
        Ok(removed)
    }

    pub fn select_project(&self, name: &str) -> Result<Project> {
        let mut ws = self.inner.write();
        let project = ws
            .projects
            .get(name)
            .cloned()
            .ok_or_else(|| CanvasError::not_found("Project", name))?;
        ws.current = Some(name.to_string());
        info!(project = %name, "project selected");
        Ok(project)
    }

    pub fn current_project(&self) -> Option<Project> {
        let ws = self.inner.read();
        ws.current
            .as_ref()
            .and_then(|name| ws.projects.get(name))
            .cloned()
    }

    /// Runs `f` against a project with read access to the library.
    pub fn with_project<R>(&self, name: &str, f: impl FnOnce(&Project, &Library) -> R) -> Result<R> {
        let ws = self.inner.read();
        let project = ws
            .projects
            .get(name)
            .ok_or_else(|| CanvasError::not_found("Project", name))?;
        Ok(f(project, &ws.library))
    }

    /// Mutates a project; the library is available for id checks.
    pub fn with_project_mut<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Project, &Library) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self.inner.write();
        let ws = &mut *guard;
        let project = ws
            .projects
            .get_mut(name)
            .ok_or_else(|| CanvasError::not_found("Project", name))?;
        f(project, &ws.library)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Domain;

    fn draft(name: &str) -> ProjectDraft {
        ProjectDraft {
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn create_selects_and_rejects_duplicates() {
        let store = CanvasStore::seeded();
        store.create_project(draft("Alpha")).unwrap();
        assert_eq!(store.current_project().unwrap().name, "Alpha");
        assert!(matches!(
            store.create_project(draft("Alpha")),
            Err(CanvasError::AlreadyExists { .. })
        ));
        store.create_project(draft("Beta")).unwrap();
        store.select_project("Alpha").unwrap();
        assert_eq!(store.current_project().unwrap().name, "Alpha");
        let names: Vec<_> = store.list_projects().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Alpha", "Beta"]);
    }

    #[test]
    fn deleting_current_project_clears_selection() {
        let store = CanvasStore::seeded();
        store.create_project(draft("Alpha")).unwrap();
        store.delete_project("Alpha").unwrap();
        assert!(store.current_project().is_none());
        assert!(store.delete_project("Alpha").is_err());
        assert!(store.select_project("Alpha").is_err());
    }

    #[test]
    fn project_mutations_see_the_library() {
        let store = CanvasStore::seeded();
        store.create_project(draft("Alpha")).unwrap();
        store
            .with_project_mut("Alpha", |p, lib| {
                p.assign_risks(Domain::Data, vec!["ADV002".into()], lib)?;
                Ok(())
            })
            .unwrap();
        let risks = store
            .with_project("Alpha", |p, _| p.bucket(Domain::Data).map(|b| b.risk_ids.clone()))
            .unwrap()
            .unwrap();
        assert_eq!(risks, ["ADV002"]);
        assert!(store.with_project("Missing", |_, _| ()).is_err());
    }
}
