//! Dashboard state
//!
//! [`DashboardState`] is the single owner of everything the map shows: the
//! loaded documents, the selected safety profile, the robot pose, the view
//! and the layer toggles. Widgets borrow it for a frame and report back
//! through return values; only the methods here mutate it.
//!
//! # Revisions
//! - `revision` moves on every change that alters the picture (except view
//!   changes, which the canvas tracks itself).
//! - `document_revision` moves only when a new map document is installed.

use crate::config::DashboardConfig;
use crate::import::{
    decode_import, DocumentKind, ImportError, ImportQueue, Imported, ImportedDocument, RawImport,
};
use crate::persist::SessionStore;
use egui::Rect;
use floorplan_model::{
    AvoidanceResolver, GraphDecoder, MapDocument, ProfileId, RobotPose, SecurityDocument,
};
use floorplan_view::{FitTarget, LayerVisibility, MapFrame, ViewAction, ViewState};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct DashboardState {
    config: DashboardConfig,
    decoder: GraphDecoder,
    avoidance: AvoidanceResolver,

    // =========================================================================
    // DOCUMENTS (replaced wholesale on import)
    // =========================================================================
    document: Option<MapDocument>,
    security: Option<SecurityDocument>,
    selected_profile: Option<ProfileId>,
    map_file_name: Option<String>,
    security_file_name: Option<String>,

    // =========================================================================
    // LIVE / UI STATE
    // =========================================================================
    pose: RobotPose,
    view: ViewState,
    visibility: LayerVisibility,
    viewport: Option<Rect>,

    // =========================================================================
    // IMPORT LIFECYCLE
    // =========================================================================
    imports: Option<ImportQueue>,
    last_error: Option<String>,

    store: SessionStore,
    revision: u64,
    document_revision: u64,
}

impl DashboardState {
    pub fn new(config: DashboardConfig, store: SessionStore) -> Self {
        Self {
            decoder: GraphDecoder::new(config.decode),
            avoidance: AvoidanceResolver::new(config.avoidance.default_radius),
            document: None,
            security: None,
            selected_profile: None,
            map_file_name: None,
            security_file_name: None,
            pose: config.robot.initial_pose,
            view: ViewState::new(config.view),
            visibility: LayerVisibility::default(),
            viewport: None,
            imports: None,
            last_error: None,
            store,
            revision: 0,
            document_revision: 0,
            config,
        }
    }

    /// State with the store named by the configuration.
    pub fn from_config(config: DashboardConfig) -> Self {
        let store = SessionStore::from_config(&config.persistence);
        Self::new(config, store)
    }

    /// Enable background file reads on the given runtime.
    pub fn with_import_runtime(mut self, runtime: tokio::runtime::Handle) -> Self {
        self.imports = Some(ImportQueue::new(runtime));
        self
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn document(&self) -> Option<&MapDocument> {
        self.document.as_ref()
    }

    pub fn security(&self) -> Option<&SecurityDocument> {
        self.security.as_ref()
    }

    pub fn selected_profile(&self) -> Option<&ProfileId> {
        self.selected_profile.as_ref()
    }

    pub fn map_file_name(&self) -> Option<&str> {
        self.map_file_name.as_deref()
    }

    pub fn security_file_name(&self) -> Option<&str> {
        self.security_file_name.as_deref()
    }

    pub fn pose(&self) -> RobotPose {
        self.pose
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn visibility(&self) -> LayerVisibility {
        self.visibility
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.imports.as_ref().is_some_and(ImportQueue::is_loading)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn document_revision(&self) -> u64 {
        self.document_revision
    }

    /// Clearance radius for the selected profile, or the default.
    pub fn avoidance_radius(&self) -> f64 {
        self.avoidance
            .forward_clearance(self.security.as_ref(), self.selected_profile.as_ref())
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    // =========================================================================
    // VIEW
    // =========================================================================

    /// Record the map's on-screen rectangle; needed for fit-to-bounds resets.
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = Some(viewport);
    }

    fn fit_target(&self) -> Option<FitTarget> {
        let doc = self.document.as_ref()?;
        Some(FitTarget {
            viewport: self.viewport?,
            width: doc.width(),
            height: doc.height(),
        })
    }

    pub fn apply_view_action(&mut self, action: ViewAction) {
        let fit = self.fit_target();
        self.view.apply(action, fit);
        debug!(
            ?action,
            scale = self.view.scale(),
            rotation = self.view.rotation_deg(),
            "view updated"
        );
    }

    pub fn set_visibility(&mut self, visibility: LayerVisibility) {
        if self.visibility != visibility {
            self.visibility = visibility;
            self.touch();
        }
    }

    // =========================================================================
    // LIVE INPUTS
    // =========================================================================

    pub fn set_robot_pose(&mut self, pose: RobotPose) {
        if self.pose != pose {
            self.pose = pose;
            self.touch();
        }
    }

    /// Select a profile by id, or clear the selection. Ids not present in the
    /// loaded security document are refused.
    pub fn select_profile(&mut self, id: Option<ProfileId>) -> bool {
        if let Some(id) = &id {
            let known = self
                .security
                .as_ref()
                .is_some_and(|doc| doc.profile(id).is_some());
            if !known {
                warn!(profile = %id, "unknown safety profile, selection unchanged");
                return false;
            }
        }
        if self.selected_profile != id {
            self.selected_profile = id;
            self.touch();
        }
        true
    }

    // =========================================================================
    // IMPORT
    // =========================================================================

    /// Decode file text that is already in memory.
    pub fn import_text(
        &mut self,
        kind: DocumentKind,
        file_name: &str,
        text: &str,
    ) -> Result<(), ImportError> {
        self.apply_import(RawImport::text(kind, file_name, text))
    }

    /// Install a decoded document, or record the failure. On failure every
    /// document, file name and persisted entry is left as it was.
    pub fn apply_import(&mut self, raw: RawImport) -> Result<(), ImportError> {
        match decode_import(&self.decoder, raw) {
            Ok(imported) => {
                self.install(imported, true);
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                warn!(kind = %err.kind(), error = %err, "import failed");
                self.last_error = Some(err.to_string());
                self.touch();
                Err(err)
            }
        }
    }

    /// Read a file in the background. Returns false when no runtime is set.
    pub fn request_import(&mut self, kind: DocumentKind, path: PathBuf) -> bool {
        match &mut self.imports {
            Some(queue) => {
                queue.request(kind, path);
                self.touch();
                true
            }
            None => {
                warn!(%kind, "no import runtime configured");
                false
            }
        }
    }

    /// Apply finished background reads. Returns how many succeeded.
    pub fn poll_imports(&mut self) -> usize {
        let finished = match &mut self.imports {
            Some(queue) => queue.poll(),
            None => return 0,
        };
        let mut applied = 0;
        for raw in finished {
            if self.apply_import(raw).is_ok() {
                applied += 1;
            }
        }
        applied
    }

    fn install(&mut self, imported: Imported, persist: bool) {
        let Imported {
            file_name,
            document,
        } = imported;
        match document {
            ImportedDocument::Map(doc) => {
                if persist {
                    if let Err(err) = self.store.save_map(&doc, &file_name) {
                        warn!(error = %err, "could not persist map document");
                    }
                }
                info!(
                    file = %file_name,
                    nodes = doc.nodes().len(),
                    edges = doc.edges().len(),
                    "map document loaded"
                );
                self.document = Some(doc);
                self.map_file_name = Some(file_name);
                self.document_revision = self.document_revision.wrapping_add(1);
            }
            ImportedDocument::Security(doc) => {
                if persist {
                    if let Err(err) = self.store.save_security(&doc, &file_name) {
                        warn!(error = %err, "could not persist security document");
                    }
                }
                self.selected_profile = doc.first_profile_id().cloned();
                info!(
                    file = %file_name,
                    profiles = doc.profiles.len(),
                    selected = ?self.selected_profile,
                    "security document loaded"
                );
                self.security = Some(doc);
                self.security_file_name = Some(file_name);
            }
        }
        self.touch();
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Load whatever the store holds. Returns whether anything was restored.
    pub fn restore_from_store(&mut self) -> bool {
        let restored = self.store.restore();
        if restored.is_empty() {
            debug!("nothing to restore");
            return false;
        }
        if let Some(doc) = restored.map {
            let file_name = restored.map_file_name;
            self.install(
                Imported {
                    file_name: file_name.clone().unwrap_or_default(),
                    document: ImportedDocument::Map(doc),
                },
                false,
            );
            // stored without a name entry: stays unnamed
            self.map_file_name = file_name;
        }
        if let Some(doc) = restored.security {
            let file_name = restored.security_file_name;
            self.install(
                Imported {
                    file_name: file_name.clone().unwrap_or_default(),
                    document: ImportedDocument::Security(doc),
                },
                false,
            );
            self.security_file_name = file_name;
        }
        true
    }

    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    // =========================================================================
    // FRAME
    // =========================================================================

    pub fn frame(&self) -> MapFrame<'_> {
        MapFrame {
            document: self.document.as_ref(),
            security: self.security.as_ref(),
            selected_profile: self.selected_profile.as_ref(),
            pose: self.pose,
            visibility: self.visibility,
            revision: self.revision,
            document_revision: self.document_revision,
        }
    }

    /// The frame together with the view, for the canvas to pan and zoom.
    pub fn frame_and_view(&mut self) -> (MapFrame<'_>, &mut ViewState) {
        let frame = MapFrame {
            document: self.document.as_ref(),
            security: self.security.as_ref(),
            selected_profile: self.selected_profile.as_ref(),
            pose: self.pose,
            visibility: self.visibility,
            revision: self.revision,
            document_revision: self.document_revision,
        };
        (frame, &mut self.view)
    }
}
