//! Permission evaluator.
//!
//! `Authorizer` is the long-lived, shareable handle: store, policy registry and
//! configuration. Request handlers open one `Session` per request; the session
//! resolves the principal once and caches each closure the first time a check
//! needs it.
//!
//! A decision runs in two phases. The gate asks the policy registry whether the
//! subject's role may attempt the action on the kind at all. For object actions
//! under a scoped grant, the scope phase then resolves the object to its child
//! (messages, day plans) or takes it directly (children, groups) and checks it
//! against the cached closure. List and create pass after the gate; creates get
//! their payload checks in `bind_message` and `bind_day_plan`.

use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::access::graph::{AccessSet, RelationshipGraph};
use crate::access::policy::{editable_child_fields, Grant, PolicyRegistry};
use crate::access::role::{Profile, Resolution, RoleResolver, Subject};
use crate::config::{AuthzConfig, Concealment};
use crate::domain::{
    ChildFields, ChildOp, DayPlanDraft, DayPlanOp, MessageDraft, MessageOp, NewDayPlan, NewMessage,
    Operation,
};
use crate::error::{AuthzError, DenyReason};
use crate::primitives::Principal;
use crate::rights::{self, ActionMask};
use crate::store::{RelationshipStore, StoreResult};
use crate::types::{
    Action, ChildId, DayPlanId, GroupId, MessageId, ObjectId, PrincipalId, ResourceKind,
};

/// Outcome of one authorization check.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    pub fn reason(self) -> Option<DenyReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(reason),
        }
    }

    /// Maps the decision onto the error a handler returns. This is the only
    /// place the concealment setting is applied.
    pub fn into_result(self, concealment: Concealment) -> Result<(), AuthzError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::ObjectMissing) => Err(AuthzError::NotFound),
            Decision::Deny(DenyReason::OutOfScope) => match concealment {
                Concealment::Forbidden => Err(AuthzError::Forbidden(DenyReason::OutOfScope)),
                Concealment::NotFound => Err(AuthzError::NotFound),
            },
            Decision::Deny(reason) => Err(AuthzError::Forbidden(reason)),
        }
    }
}

/// Shareable evaluator over one relationship store.
#[derive(Debug)]
pub struct Authorizer<S: RelationshipStore> {
    store: Arc<S>,
    registry: &'static PolicyRegistry,
    config: AuthzConfig,
    resolver: RoleResolver<S>,
    graph: RelationshipGraph<S>,
}

impl<S: RelationshipStore> Clone for Authorizer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: self.registry,
            config: self.config.clone(),
            resolver: self.resolver.clone(),
            graph: self.graph.clone(),
        }
    }
}

impl<S: RelationshipStore> Authorizer<S> {
    /// Evaluator with the canonical registry and default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            resolver: RoleResolver::new(Arc::clone(&store)),
            graph: RelationshipGraph::new(Arc::clone(&store)),
            store,
            registry: PolicyRegistry::canonical(),
            config: AuthzConfig::default(),
        }
    }

    pub fn with_config(store: Arc<S>, config: AuthzConfig) -> Result<Self, AuthzError> {
        config.validate()?;
        let mut authorizer = Self::new(store);
        authorizer.config = config;
        Ok(authorizer)
    }

    pub fn with_registry(mut self, registry: &'static PolicyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    pub fn registry(&self) -> &'static PolicyRegistry {
        self.registry
    }

    /// Opens a per-request session for an authenticated principal.
    pub fn session(&self, principal: &Principal) -> Result<Session<'_, S>, AuthzError> {
        let resolution = self.resolver.resolve(principal)?;
        Ok(Session::new(self, principal.id, resolution))
    }

    /// Like `session`, loading the principal from the store first.
    pub fn session_for_id(&self, id: PrincipalId) -> Result<Session<'_, S>, AuthzError> {
        match self.resolver.resolve_id(id)? {
            Resolution::Unauthenticated => Err(AuthzError::Unauthenticated),
            resolution => Ok(Session::new(self, id, resolution)),
        }
    }

    /// One-shot check without keeping the session around.
    pub fn authorize(
        &self,
        principal: &Principal,
        action: Action,
        kind: ResourceKind,
        target: Option<ObjectId>,
    ) -> Result<Decision, AuthzError> {
        self.session(principal)?.authorize(action, kind, target)
    }

    /// One-shot accessible-id set for a list view.
    pub fn filter_accessible(
        &self,
        principal: &Principal,
        kind: ResourceKind,
    ) -> Result<AccessSet<ObjectId>, AuthzError> {
        self.session(principal)?.filter_accessible(kind)
    }
}

/// Per-request evaluator handle. Not shared across requests.
#[derive(Debug)]
pub struct Session<'a, S: RelationshipStore> {
    authz: &'a Authorizer<S>,
    principal: PrincipalId,
    resolution: Resolution,
    children: OnceCell<AccessSet<ChildId>>,
    groups: OnceCell<AccessSet<GroupId>>,
    messages: OnceCell<AccessSet<MessageId>>,
    day_plans: OnceCell<AccessSet<DayPlanId>>,
}

fn cached<T, F>(cell: &OnceCell<T>, init: F) -> StoreResult<&T>
where
    F: FnOnce() -> StoreResult<T>,
{
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = init()?;
    Ok(cell.get_or_init(|| value))
}

impl<'a, S: RelationshipStore> Session<'a, S> {
    fn new(authz: &'a Authorizer<S>, principal: PrincipalId, resolution: Resolution) -> Self {
        Self {
            authz,
            principal,
            resolution,
            children: OnceCell::new(),
            groups: OnceCell::new(),
            messages: OnceCell::new(),
            day_plans: OnceCell::new(),
        }
    }

    pub fn principal(&self) -> PrincipalId {
        self.principal
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn subject(&self) -> Option<&Subject> {
        self.resolution.subject()
    }

    /// The integrity failure behind this session, as an operator-facing error.
    pub fn integrity_error(&self) -> Option<AuthzError> {
        match self.resolution {
            Resolution::IntegrityFailure(failure) => Some(failure.into()),
            _ => None,
        }
    }

    // --- Gate ----------------------------------------------------------------

    /// Reach of the subject for (kind, action). Unresolved subjects get nothing.
    pub fn grant(&self, kind: ResourceKind, action: Action) -> Grant {
        let Some(subject) = self.subject() else {
            return Grant::Denied;
        };
        if subject.is_admin() {
            return Grant::Unrestricted;
        }
        let grant = self
            .authz
            .registry
            .grant(subject.role, subject.is_staff, kind, action);
        if self.authz.config.staff_child_roster
            && subject.is_staff
            && kind == ResourceKind::Child
            && action == Action::List
        {
            return Grant::Unrestricted;
        }
        grant
    }

    /// Actions the subject may attempt on `kind`, after the admin bypass and
    /// the staff roster setting.
    pub fn action_mask(&self, kind: ResourceKind) -> ActionMask {
        Action::ALL
            .into_iter()
            .filter(|action| !self.grant(kind, *action).is_denied())
            .fold(0, |mask, action| mask | rights::bit(action))
    }

    /// Phase 1: may the subject attempt `action` on `kind` at all.
    pub fn can_attempt(&self, action: Action, kind: ResourceKind) -> bool {
        rights::permits(self.action_mask(kind), action)
    }

    /// Child fields this subject may change. Admins edit every field whatever
    /// their role tag says.
    pub fn editable_child_fields(&self) -> ChildFields {
        match self.subject() {
            Some(subject) if subject.is_admin() => ChildFields::ALL,
            Some(subject) => editable_child_fields(subject.role),
            None => ChildFields::NONE,
        }
    }

    // --- Closures ------------------------------------------------------------

    // A teacher's children derive from the cached group closure, a parent's
    // groups from the cached child closure.

    pub fn children(&self) -> StoreResult<&AccessSet<ChildId>> {
        cached(&self.children, || match self.subject() {
            Some(subject) if matches!(subject.profile, Profile::Teacher(_)) => {
                let groups = self.groups()?;
                self.authz.graph.children_reachable(groups)
            }
            Some(subject) => self.authz.graph.children(subject),
            None => Ok(AccessSet::empty()),
        })
    }

    pub fn groups(&self) -> StoreResult<&AccessSet<GroupId>> {
        cached(&self.groups, || match self.subject() {
            Some(subject) if matches!(subject.profile, Profile::Parent(_)) => {
                let children = self.children()?;
                self.authz.graph.groups_reachable(children)
            }
            Some(subject) => self.authz.graph.groups(subject),
            None => Ok(AccessSet::empty()),
        })
    }

    pub fn messages(&self) -> StoreResult<&AccessSet<MessageId>> {
        cached(&self.messages, || {
            let children = self.children()?;
            self.authz.graph.messages_reachable(children)
        })
    }

    pub fn day_plans(&self) -> StoreResult<&AccessSet<DayPlanId>> {
        cached(&self.day_plans, || {
            let children = self.children()?;
            self.authz.graph.day_plans_reachable(children)
        })
    }

    // --- Decisions -----------------------------------------------------------

    /// Gate and scope check for one (action, kind, optional object) triple.
    ///
    /// A child update checked here carries no field mask and is treated as
    /// touching every field, so it is only allowed for subjects that may edit
    /// the whole record. Use `authorize_child_update` to check a field set.
    pub fn authorize(
        &self,
        action: Action,
        kind: ResourceKind,
        target: Option<ObjectId>,
    ) -> Result<Decision, AuthzError> {
        self.decide(action, kind, target, None)
    }

    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(principal = %self.principal, kind = %kind, action = %action)
    )]
    fn decide(
        &self,
        action: Action,
        kind: ResourceKind,
        target: Option<ObjectId>,
        fields: Option<ChildFields>,
    ) -> Result<Decision, AuthzError> {
        let decision = match self.resolution {
            Resolution::Unauthenticated => return Err(AuthzError::Unauthenticated),
            Resolution::IntegrityFailure(_) => Decision::Deny(DenyReason::IntegrityFailure),
            Resolution::Resolved(_) => self.evaluate(action, kind, target, fields)?,
        };
        debug!(?decision, "authorization decision");
        Ok(decision)
    }

    fn evaluate(
        &self,
        action: Action,
        kind: ResourceKind,
        target: Option<ObjectId>,
        fields: Option<ChildFields>,
    ) -> Result<Decision, AuthzError> {
        let grant = self.grant(kind, action);
        if grant.is_denied() {
            return Ok(Decision::Deny(DenyReason::NotPermitted));
        }
        let decision = match target {
            _ if matches!(action, Action::Create | Action::List) => Decision::Allow,
            _ if grant == Grant::Unrestricted => Decision::Allow,
            Some(object) if object.kind() == kind => self.in_scope(object)?,
            _ => Decision::Deny(DenyReason::MissingObject),
        };
        if !decision.is_allowed() || (kind, action) != (ResourceKind::Child, Action::Update) {
            return Ok(decision);
        }

        let fields = fields.unwrap_or(ChildFields::ALL);
        if !self.editable_child_fields().contains(fields) {
            debug!(principal = %self.principal, fields = fields.bits(), "child fields not editable");
            return Ok(Decision::Deny(DenyReason::FieldNotEditable));
        }
        Ok(Decision::Allow)
    }

    /// Phase 2: is the object inside the subject's closure. Existence is only
    /// looked up on the denial path.
    pub fn in_scope(&self, object: ObjectId) -> Result<Decision, AuthzError> {
        let store = &self.authz.store;
        match object {
            ObjectId::Child(child) => self.child_in_scope(child),
            ObjectId::Group(group) => {
                if self.groups()?.contains(&group) {
                    Ok(Decision::Allow)
                } else if store.group_exists(group)? {
                    Ok(Decision::Deny(DenyReason::OutOfScope))
                } else {
                    Ok(Decision::Deny(DenyReason::ObjectMissing))
                }
            }
            ObjectId::Message(message) => match store.child_of_message(message)? {
                Some(child) => self.child_in_scope(child),
                None => Ok(Decision::Deny(DenyReason::ObjectMissing)),
            },
            ObjectId::DayPlan(plan) => match store.child_of_day_plan(plan)? {
                Some(child) => self.child_in_scope(child),
                None => Ok(Decision::Deny(DenyReason::ObjectMissing)),
            },
        }
    }

    fn child_in_scope(&self, child: ChildId) -> Result<Decision, AuthzError> {
        if self.children()?.contains(&child) {
            return Ok(Decision::Allow);
        }
        Ok(match self.authz.store.group_of_child(child)? {
            Some(_) => Decision::Deny(DenyReason::OutOfScope),
            None => Decision::Deny(DenyReason::ObjectMissing),
        })
    }

    /// Full decision for a typed operation: gate, scope, the child a create
    /// attaches to, and the field mask of a child update.
    pub fn authorize_operation(&self, op: &Operation) -> Result<Decision, AuthzError> {
        let decision = self.decide(op.action(), op.kind(), op.target(), op.child_fields())?;
        if !decision.is_allowed() {
            return Ok(decision);
        }

        if let Some(child) = op.create_for_child() {
            if self.grant(op.kind(), Action::Create) == Grant::Scoped {
                return self.child_in_scope(child);
            }
        }
        Ok(Decision::Allow)
    }

    pub fn authorize_child_update(
        &self,
        child: ChildId,
        fields: ChildFields,
    ) -> Result<Decision, AuthzError> {
        self.authorize_operation(&Operation::Child(ChildOp::Update(child, fields)))
    }

    /// `authorize_operation` with the configured concealment applied.
    pub fn check(&self, op: &Operation) -> Result<(), AuthzError> {
        self.authorize_operation(op)?
            .into_result(self.authz.config.concealment)
    }

    pub fn check_action(
        &self,
        action: Action,
        kind: ResourceKind,
        target: Option<ObjectId>,
    ) -> Result<(), AuthzError> {
        self.authorize(action, kind, target)?
            .into_result(self.authz.config.concealment)
    }

    // --- List filtering ------------------------------------------------------

    /// Ids a list view of `kind` may show. Empty when the list gate fails.
    #[tracing::instrument(level = "debug", skip_all, fields(principal = %self.principal, kind = %kind))]
    pub fn filter_accessible(&self, kind: ResourceKind) -> Result<AccessSet<ObjectId>, AuthzError> {
        let set = match self.grant(kind, Action::List) {
            Grant::Denied => AccessSet::empty(),
            Grant::Unrestricted => AccessSet::All,
            Grant::Scoped => match kind {
                ResourceKind::Child => self.children()?.clone().map(ObjectId::Child),
                ResourceKind::Group => self.groups()?.clone().map(ObjectId::Group),
                ResourceKind::Message => self.messages()?.clone().map(ObjectId::Message),
                ResourceKind::DayPlan => self.day_plans()?.clone().map(ObjectId::DayPlan),
                ResourceKind::Institution => AccessSet::empty(),
            },
        };
        debug!(size = ?set.len(), "accessible set");
        Ok(set)
    }

    pub fn accessible_children(&self) -> Result<AccessSet<ChildId>, AuthzError> {
        self.typed_list(ResourceKind::Child, || self.children().cloned())
    }

    pub fn accessible_groups(&self) -> Result<AccessSet<GroupId>, AuthzError> {
        self.typed_list(ResourceKind::Group, || self.groups().cloned())
    }

    pub fn accessible_messages(&self) -> Result<AccessSet<MessageId>, AuthzError> {
        self.typed_list(ResourceKind::Message, || self.messages().cloned())
    }

    pub fn accessible_day_plans(&self) -> Result<AccessSet<DayPlanId>, AuthzError> {
        self.typed_list(ResourceKind::DayPlan, || self.day_plans().cloned())
    }

    /// Accessible messages sent by `sender`: one side of a conversation about
    /// the children this session reaches.
    pub fn accessible_messages_from(
        &self,
        sender: PrincipalId,
    ) -> Result<BTreeSet<MessageId>, AuthzError> {
        let reachable = self.accessible_messages()?;
        if reachable.is_empty() {
            return Ok(BTreeSet::new());
        }
        let sent = self.authz.store.messages_from(sender)?;
        Ok(reachable.intersect(sent))
    }

    fn typed_list<T, F>(&self, kind: ResourceKind, closure: F) -> Result<AccessSet<T>, AuthzError>
    where
        T: Ord,
        F: FnOnce() -> StoreResult<AccessSet<T>>,
    {
        Ok(match self.grant(kind, Action::List) {
            Grant::Denied => AccessSet::empty(),
            Grant::Unrestricted => AccessSet::All,
            Grant::Scoped => closure()?,
        })
    }

    // --- Payload binding -----------------------------------------------------

    /// Checks a message draft and binds it to this principal.
    #[tracing::instrument(level = "debug", skip_all, fields(principal = %self.principal, child = %draft.child))]
    pub fn bind_message(&self, draft: MessageDraft) -> Result<NewMessage, AuthzError> {
        self.check(&Operation::Message(MessageOp::Create(draft.child)))?;

        if let Some(declared) = draft.sender {
            if declared != self.principal {
                warn!(
                    principal = %self.principal,
                    declared = %declared,
                    "discarding client-declared message sender"
                );
            }
        }

        let text = draft.text.trim();
        if text.is_empty() {
            return Err(AuthzError::InvalidPayload("message text is empty".into()));
        }
        let limit = self.authz.config.max_message_chars;
        let length = text.chars().count();
        if length > limit {
            return Err(AuthzError::InvalidPayload(format!(
                "message text has {length} characters, limit is {limit}"
            )));
        }

        Ok(NewMessage {
            sender: self.principal,
            child: draft.child,
            text: text.to_string(),
        })
    }

    /// Checks a day plan draft. `today` is the institution's current date.
    #[tracing::instrument(level = "debug", skip_all, fields(principal = %self.principal, child = %draft.child))]
    pub fn bind_day_plan(&self, draft: DayPlanDraft, today: NaiveDate) -> Result<NewDayPlan, AuthzError> {
        self.check(&Operation::DayPlan(DayPlanOp::Create(draft.child)))?;

        if draft.day < today {
            return Err(AuthzError::InvalidPayload(format!(
                "day plan for {} is in the past",
                draft.day
            )));
        }
        if let Some(existing) = self.authz.store.day_plan_for(draft.child, draft.day)? {
            return Err(AuthzError::Conflict(format!(
                "day plan {existing} already covers child {} on {}",
                draft.child, draft.day
            )));
        }
        Ok(draft.into())
    }
}
