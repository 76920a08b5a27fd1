#![forbid(unsafe_code)]
//! shift-resolver : affectation de gardes médicales par flot max à coût min.
//!
//! - Modèle : personnel (rôle, spécialités, disponibilités, quota, repos) et
//!   gardes (fenêtre, rôle, effectif, priorité).
//! - Couverture maximale d'abord, équité et préférences ensuite (coûts).
//! - Écarts de couverture expliqués, jamais levés comme erreurs.
//! - Tout en UTC ; entrées/sorties JSON et CSV.

pub mod io;
pub mod model;
pub mod resolver;
pub mod storage;
pub mod template;

pub use model::{ResolveRequest, Role, Shift, ShiftId, StaffId, StaffMember, TimeWindow};
pub use resolver::{
    resolve, Assignment, Budget, CancelToken, FeasibilityGap, GapReason, ResolveError,
    ResolveResponse, ResolveStatus, Resolver, ResolverOptions,
};
pub use storage::{JsonStorage, Storage};
pub use template::{
    generate_shifts, generate_shifts_within, load_template_from_file, GroupBy, Slot, Template,
};
