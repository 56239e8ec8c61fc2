use crate::{
    change::{squash_resource_changes, ResourceChange},
    class::IngressClass,
    problem::{ConfigurationObject, ConfigurationProblem, Reason},
    reference::{
        AppProtectReferenceChecker, PolicyReferenceChecker, ReferenceChecker,
        SecretReferenceChecker, ServiceReferenceChecker,
    },
    resource::{
        IngressConfiguration, MinionConfiguration, Resource, ResourceKey, ResourceKind,
        VirtualServerConfiguration,
    },
    validation::{FieldErrors, Validator},
};
use ahash::AHashSet as HashSet;
use ingress_controller_k8s_api::{
    resource_id, Ingress, IngressExt, ResourceId, VirtualServer, VirtualServerRoute,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// The outcome of a mutation: the changes the renderer must apply, and the
/// problems to report on objects.
pub type Updates = (Vec<ResourceChange>, Vec<ConfigurationProblem>);

/// Holds the latest valid Ingresses, VirtualServers and VirtualServerRoutes,
/// and the resources built from them that own each host.
///
/// Every mutation rebuilds the host table from the registered objects and
/// diffs it against the previous table. Objects that lose all of their hosts
/// stay registered so that they reclaim a host as soon as it is released.
#[derive(Debug)]
pub struct Configuration {
    hosts: BTreeMap<String, Arc<Resource>>,

    ingresses: BTreeMap<ResourceId, Arc<Ingress>>,
    virtual_servers: BTreeMap<ResourceId, Arc<VirtualServer>>,
    virtual_server_routes: BTreeMap<ResourceId, Arc<VirtualServerRoute>>,

    problems: BTreeMap<ResourceKey, ConfigurationProblem>,

    class: IngressClass,
    validator: Box<dyn Validator>,

    secrets: SecretReferenceChecker,
    services: ServiceReferenceChecker,
    policies: PolicyReferenceChecker,
    app_protect_policies: AppProtectReferenceChecker,
    app_protect_log_confs: AppProtectReferenceChecker,
}

/// Selects the kinds returned by [`Configuration::get_resources_with_filter`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResourceFilter {
    pub ingresses: bool,
    pub virtual_servers: bool,
}

/// Accumulates resources and host claims while the table is rebuilt.
#[derive(Debug, Default)]
struct HostTableBuilder {
    resources: BTreeMap<ResourceKey, Resource>,
    owners: BTreeMap<String, ResourceKey>,
}

// === impl Configuration ===

impl Configuration {
    pub fn new(class: IngressClass, validator: Box<dyn Validator>, is_plus: bool) -> Self {
        Self {
            hosts: BTreeMap::new(),
            ingresses: BTreeMap::new(),
            virtual_servers: BTreeMap::new(),
            virtual_server_routes: BTreeMap::new(),
            problems: BTreeMap::new(),
            class,
            validator,
            secrets: SecretReferenceChecker::new(is_plus),
            services: ServiceReferenceChecker::default(),
            policies: PolicyReferenceChecker::default(),
            app_protect_policies: AppProtectReferenceChecker::policies(),
            app_protect_log_confs: AppProtectReferenceChecker::log_confs(),
        }
    }

    /// Adds or updates a regular, master or minion Ingress.
    pub fn upsert_ingress(&mut self, ingress: Ingress) -> Updates {
        let ingress = Arc::new(ingress);
        let id = resource_id(&*ingress);

        let mut rejection = None;
        if !self.class.accepts_ingress(&ingress) {
            tracing::debug!(%id, "Ingress does not match the ingress class");
            self.ingresses.remove(&id);
        } else {
            match self.validator.validate_ingress(&ingress) {
                Ok(()) => {
                    self.ingresses.insert(id.clone(), ingress.clone());
                }
                Err(error) => {
                    tracing::debug!(%id, %error, "Ingress is invalid");
                    self.ingresses.remove(&id);
                    let message = error.to_string();
                    rejection = Some((error, message));
                }
            }
        }

        let updates = self.rebuild();
        self.report_rejection(
            ResourceKey::ingress(id),
            ConfigurationObject::Ingress(ingress),
            rejection,
            updates,
        )
    }

    pub fn delete_ingress(&mut self, id: &ResourceId) -> Updates {
        if self.ingresses.remove(id).is_none() {
            return Default::default();
        }
        tracing::debug!(%id, "Deleted Ingress");
        self.rebuild()
    }

    pub fn upsert_virtual_server(&mut self, vs: VirtualServer) -> Updates {
        let vs = Arc::new(vs);
        let id = resource_id(&*vs);

        let mut rejection = None;
        if !self.class.accepts_virtual_server(&vs) {
            tracing::debug!(%id, "VirtualServer does not match the ingress class");
            self.virtual_servers.remove(&id);
        } else {
            match self.validator.validate_virtual_server(&vs) {
                Ok(()) => {
                    self.virtual_servers.insert(id.clone(), vs.clone());
                }
                Err(error) => {
                    tracing::debug!(%id, %error, "VirtualServer is invalid");
                    self.virtual_servers.remove(&id);
                    let message = format!("VirtualServer {id} was rejected with error: {error}");
                    rejection = Some((error, message));
                }
            }
        }

        let updates = self.rebuild();
        self.report_rejection(
            ResourceKey::virtual_server(id),
            ConfigurationObject::VirtualServer(vs),
            rejection,
            updates,
        )
    }

    pub fn delete_virtual_server(&mut self, id: &ResourceId) -> Updates {
        if self.virtual_servers.remove(id).is_none() {
            return Default::default();
        }
        tracing::debug!(%id, "Deleted VirtualServer");
        self.rebuild()
    }

    pub fn upsert_virtual_server_route(&mut self, vsr: VirtualServerRoute) -> Updates {
        let vsr = Arc::new(vsr);
        let id = resource_id(&*vsr);

        let mut rejection = None;
        if !self.class.accepts_virtual_server_route(&vsr) {
            tracing::debug!(%id, "VirtualServerRoute does not match the ingress class");
            self.virtual_server_routes.remove(&id);
        } else {
            match self.validator.validate_virtual_server_route(&vsr) {
                Ok(()) => {
                    self.virtual_server_routes.insert(id.clone(), vsr.clone());
                }
                Err(error) => {
                    tracing::debug!(%id, %error, "VirtualServerRoute is invalid");
                    self.virtual_server_routes.remove(&id);
                    let message =
                        format!("VirtualServerRoute {id} was rejected with error: {error}");
                    rejection = Some((error, message));
                }
            }
        }

        let updates = self.rebuild();
        self.report_rejection(
            ResourceKey::virtual_server_route(id),
            ConfigurationObject::VirtualServerRoute(vsr),
            rejection,
            updates,
        )
    }

    pub fn delete_virtual_server_route(&mut self, id: &ResourceId) -> Updates {
        if self.virtual_server_routes.remove(id).is_none() {
            return Default::default();
        }
        tracing::debug!(%id, "Deleted VirtualServerRoute");
        self.rebuild()
    }

    /// Returns every resource that owns at least one host, ordered by key.
    pub fn get_resources(&self) -> Vec<Arc<Resource>> {
        self.get_resources_with_filter(ResourceFilter::ALL)
    }

    pub fn get_resources_with_filter(&self, filter: ResourceFilter) -> Vec<Arc<Resource>> {
        let resources = self
            .hosts
            .values()
            .filter(|r| filter.includes(r.kind()))
            .map(|r| (r.key(), r.clone()))
            .collect::<BTreeMap<_, _>>();
        resources.into_values().collect()
    }

    /// The resource owning `host`, if any.
    pub fn get_host_owner(&self, host: &str) -> Option<&Arc<Resource>> {
        self.hosts.get(host)
    }

    /// Finds the resources that reference `namespace/name` directly or
    /// through one of their minions or VirtualServerRoutes. Resources are
    /// returned once each, in the order of their hosts.
    pub fn find_resources_referencing(
        &self,
        namespace: &str,
        name: &str,
        checker: &dyn ReferenceChecker,
    ) -> Vec<Arc<Resource>> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for resource in self.hosts.values() {
            if !seen.insert(resource.key()) {
                continue;
            }
            let referenced = match &**resource {
                Resource::Ingress(ic) => {
                    checker.is_referenced_by_ingress(namespace, name, &ic.ingress)
                        || ic.minions.iter().any(|minion| {
                            checker.is_referenced_by_minion(namespace, name, &minion.ingress)
                        })
                }
                Resource::VirtualServer(vsc) => {
                    checker.is_referenced_by_virtual_server(namespace, name, &vsc.virtual_server)
                        || vsc.virtual_server_routes.iter().any(|vsr| {
                            checker.is_referenced_by_virtual_server_route(namespace, name, vsr)
                        })
                }
            };
            if referenced {
                found.push(resource.clone());
            }
        }
        found
    }

    pub fn find_resources_for_secret(&self, namespace: &str, name: &str) -> Vec<Arc<Resource>> {
        self.find_resources_referencing(namespace, name, &self.secrets)
    }

    pub fn find_resources_for_service(&self, namespace: &str, name: &str) -> Vec<Arc<Resource>> {
        self.find_resources_referencing(namespace, name, &self.services)
    }

    /// Endpoints are referenced through the Service of the same name.
    pub fn find_resources_for_endpoints(&self, namespace: &str, name: &str) -> Vec<Arc<Resource>> {
        self.find_resources_for_service(namespace, name)
    }

    pub fn find_resources_for_policy(&self, namespace: &str, name: &str) -> Vec<Arc<Resource>> {
        self.find_resources_referencing(namespace, name, &self.policies)
    }

    pub fn find_resources_for_app_protect_policy(
        &self,
        namespace: &str,
        name: &str,
    ) -> Vec<Arc<Resource>> {
        self.find_resources_referencing(namespace, name, &self.app_protect_policies)
    }

    pub fn find_resources_for_app_protect_log_conf(
        &self,
        namespace: &str,
        name: &str,
    ) -> Vec<Arc<Resource>> {
        self.find_resources_referencing(namespace, name, &self.app_protect_log_confs)
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// The number of registered objects of a kind, including those that own
    /// no host.
    pub fn registered_count(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Ingress => self.ingresses.len(),
            ResourceKind::VirtualServer => self.virtual_servers.len(),
            ResourceKind::VirtualServerRoute => self.virtual_server_routes.len(),
        }
    }

    pub fn problem_count(&self) -> usize {
        self.problems.len()
    }

    /// Attaches a validation error to the resource's Delete, if the rejected
    /// object had been configured, and reports the rejection.
    fn report_rejection(
        &self,
        key: ResourceKey,
        object: ConfigurationObject,
        rejection: Option<(FieldErrors, String)>,
        (mut changes, mut problems): Updates,
    ) -> Updates {
        if let Some((error, message)) = rejection {
            if let Some(change) = changes.iter_mut().find(|c| c.key() == key) {
                change.error = Some(error.to_string());
            }
            problems.push(ConfigurationProblem::rejected(object, message));
        }
        (changes, problems)
    }

    fn rebuild(&mut self) -> Updates {
        let (hosts, resources) = self.build_hosts_and_resources();

        let changes = resource_changes(&self.hosts, &hosts);
        self.hosts = hosts;

        // Deleted resources are still reported with the newest snapshot, if
        // one exists, so that its warnings are not lost.
        let mut changes = squash_resource_changes(changes);
        for change in &mut changes {
            if let Some(latest) = resources.get(&change.key()) {
                change.resource = latest.clone();
            }
        }

        let problems = self.build_problems(&resources);
        let updated = problems
            .iter()
            .filter(|(key, p)| !self.problems.get(*key).is_some_and(|old| old.same_as(p)))
            .map(|(_, p)| p.clone())
            .collect::<Vec<_>>();
        self.problems = problems;

        tracing::debug!(
            changes = changes.len(),
            problems = updated.len(),
            hosts = self.hosts.len(),
            "Rebuilt configuration"
        );
        (changes, updated)
    }

    fn build_hosts_and_resources(
        &self,
    ) -> (
        BTreeMap<String, Arc<Resource>>,
        BTreeMap<ResourceKey, Arc<Resource>>,
    ) {
        let mut table = HostTableBuilder::default();

        for (id, ingress) in &self.ingresses {
            if ingress.is_minion() {
                continue;
            }

            let config = if ingress.is_master() {
                let host = ingress.hosts().first().copied().unwrap_or_default();
                let (minions, child_warnings) = self.build_minion_configs(host);
                IngressConfiguration::master(ingress.clone(), minions, child_warnings)
            } else {
                IngressConfiguration::regular(ingress.clone())
            };

            let hosts = ingress.hosts().into_iter().map(str::to_string);
            table.insert(ResourceKey::ingress(id.clone()), Resource::Ingress(config), hosts);
        }

        for (id, vs) in &self.virtual_servers {
            let (vsrs, warnings) = self.build_virtual_server_routes(vs);
            let config = VirtualServerConfiguration::new(vs.clone(), vsrs, warnings);
            let host = Some(vs.spec.host.clone()).filter(|h| !h.is_empty());
            table.insert(
                ResourceKey::virtual_server(id.clone()),
                Resource::VirtualServer(config),
                host,
            );
        }

        table.finish()
    }

    /// Collects the minions of the master for `master_host`, in key order.
    /// A path already served by an earlier minion is left to that minion.
    fn build_minion_configs(
        &self,
        master_host: &str,
    ) -> (Vec<MinionConfiguration>, BTreeMap<ResourceId, Vec<String>>) {
        let mut minions = Vec::new();
        let mut child_warnings = BTreeMap::<ResourceId, Vec<String>>::new();
        let mut claimed = BTreeSet::new();

        for (id, ingress) in &self.ingresses {
            if !ingress.is_minion() || ingress.hosts().first() != Some(&master_host) {
                continue;
            }

            let mut minion = MinionConfiguration::new(ingress.clone());
            for path in ingress.paths() {
                let path = path.path.clone().unwrap_or_default();
                if claimed.insert(path.clone()) {
                    minion.valid_paths.insert(path);
                } else {
                    child_warnings
                        .entry(id.clone())
                        .or_default()
                        .push(format!("path {path} is taken by another resource"));
                }
            }
            minions.push(minion);
        }

        (minions, child_warnings)
    }

    /// Resolves the VirtualServerRoutes that a VirtualServer delegates to.
    /// Routes that are missing or do not fit the delegating route are
    /// reported as warnings on the VirtualServer.
    fn build_virtual_server_routes(
        &self,
        vs: &VirtualServer,
    ) -> (Vec<Arc<VirtualServerRoute>>, Vec<String>) {
        let ns = vs.metadata.namespace.as_deref().unwrap_or_default();
        let mut vsrs = Vec::new();
        let mut warnings = Vec::new();

        for route in &vs.spec.routes {
            let Some(reference) = route.route.as_deref().filter(|r| !r.is_empty()) else {
                continue;
            };
            let id = ResourceId::from_reference(reference, ns);

            let Some(vsr) = self.virtual_server_routes.get(&id) else {
                warnings.push(format!("VirtualServerRoute {id} doesn't exist or invalid"));
                continue;
            };

            match self.validator.validate_virtual_server_route_for_virtual_server(
                vsr,
                &vs.spec.host,
                &route.path,
            ) {
                Ok(()) => vsrs.push(vsr.clone()),
                Err(error) => {
                    warnings.push(format!("VirtualServerRoute {id} is invalid: {error}"));
                }
            }
        }

        (vsrs, warnings)
    }

    fn build_problems(
        &self,
        resources: &BTreeMap<ResourceKey, Arc<Resource>>,
    ) -> BTreeMap<ResourceKey, ConfigurationProblem> {
        let mut problems = BTreeMap::new();

        for (key, resource) in resources {
            let problem = match &**resource {
                Resource::Ingress(ic) if ic.valid_hosts.is_empty() => {
                    ConfigurationProblem::warning(
                        ConfigurationObject::Ingress(ic.ingress.clone()),
                        Reason::Rejected,
                        "All hosts are taken by other resources",
                    )
                }
                Resource::VirtualServer(vsc)
                    if self
                        .hosts
                        .get(vsc.host())
                        .is_some_and(|owner| owner.key() != *key) =>
                {
                    ConfigurationProblem::warning(
                        ConfigurationObject::VirtualServer(vsc.virtual_server.clone()),
                        Reason::Rejected,
                        "Host is taken by another resource",
                    )
                }
                _ => continue,
            };
            problems.insert(key.clone(), problem);
        }

        for (id, ingress) in &self.ingresses {
            if !ingress.is_minion() {
                continue;
            }
            let has_master = ingress
                .hosts()
                .first()
                .and_then(|host| self.hosts.get(*host))
                .is_some_and(|owner| matches!(&**owner, Resource::Ingress(ic) if ic.is_master));
            if !has_master {
                problems.insert(
                    ResourceKey::ingress(id.clone()),
                    ConfigurationProblem::warning(
                        ConfigurationObject::Ingress(ingress.clone()),
                        Reason::NoIngressMasterFound,
                        "Ingress master is invalid or doesn't exist",
                    ),
                );
            }
        }

        for (id, vsr) in &self.virtual_server_routes {
            let object = ConfigurationObject::VirtualServerRoute(vsr.clone());
            let problem = match self.hosts.get(&vsr.spec.host).map(|owner| &**owner) {
                Some(Resource::VirtualServer(vsc)) if vsc.attaches(id) => continue,
                Some(Resource::VirtualServer(vsc)) => ConfigurationProblem::warning(
                    object,
                    Reason::Ignored,
                    format!(
                        "VirtualServer {} ignores VirtualServerRoute",
                        resource_id(&*vsc.virtual_server)
                    ),
                ),
                _ => ConfigurationProblem::warning(
                    object,
                    Reason::NoVirtualServerFound,
                    "VirtualServer is invalid or doesn't exist",
                ),
            };
            problems.insert(ResourceKey::virtual_server_route(id.clone()), problem);
        }

        problems
    }
}

/// Diffs two host tables.
///
/// A host that disappears deletes its old owner. A host whose owner changed
/// identity deletes the old owner and updates the new one; a host whose owner
/// changed otherwise updates it. A new host updates its owner. Deletes are
/// listed first.
fn resource_changes(
    old: &BTreeMap<String, Arc<Resource>>,
    new: &BTreeMap<String, Arc<Resource>>,
) -> Vec<ResourceChange> {
    let mut deletes = Vec::new();
    let mut updates = Vec::new();
    let mut added = Vec::new();

    for (host, old_owner) in old {
        if !new.contains_key(host) {
            tracing::trace!(%host, owner = %old_owner.key(), "Host removed");
            deletes.push(ResourceChange::delete(old_owner.clone()));
        }
    }

    for (host, new_owner) in new {
        match old.get(host) {
            None => {
                tracing::trace!(%host, owner = %new_owner.key(), "Host added");
                added.push(ResourceChange::add_or_update(new_owner.clone()));
            }
            Some(old_owner) if !old_owner.is_equal(new_owner) => {
                tracing::trace!(%host, owner = %new_owner.key(), "Host updated");
                if old_owner.key() != new_owner.key() {
                    deletes.push(ResourceChange::delete(old_owner.clone()));
                }
                updates.push(ResourceChange::add_or_update(new_owner.clone()));
            }
            Some(_) => {}
        }
    }

    deletes.extend(updates);
    deletes.extend(added);
    deletes
}

// === impl ResourceFilter ===

impl ResourceFilter {
    pub const ALL: Self = Self {
        ingresses: true,
        virtual_servers: true,
    };

    fn includes(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Ingress => self.ingresses,
            ResourceKind::VirtualServer => self.virtual_servers,
            ResourceKind::VirtualServerRoute => false,
        }
    }
}

// === impl HostTableBuilder ===

impl HostTableBuilder {
    fn insert(
        &mut self,
        key: ResourceKey,
        resource: Resource,
        hosts: impl IntoIterator<Item = String>,
    ) {
        self.resources.insert(key.clone(), resource);
        for host in hosts {
            self.claim(&key, host);
        }
    }

    /// Gives `host` to `key` unless its current owner wins.
    fn claim(&mut self, key: &ResourceKey, host: String) {
        let holder = match self.owners.get(&host) {
            None => {
                self.owners.insert(host.clone(), key.clone());
                if let Some(resource) = self.resources.get_mut(key) {
                    resource.acquire_host(host);
                }
                return;
            }
            Some(holder) if holder == key => return,
            Some(holder) => holder.clone(),
        };

        let (Some(current), Some(candidate)) =
            (self.resources.get(&holder), self.resources.get(key))
        else {
            return;
        };
        let warning = format!("host {host} is taken by another resource");

        if current.wins(candidate) {
            tracing::trace!(%host, owner = %holder, loser = %key, "Host kept");
            if let Some(candidate) = self.resources.get_mut(key) {
                candidate.add_warning(warning);
            }
            return;
        }

        tracing::trace!(%host, owner = %key, loser = %holder, "Host taken over");
        if let Some(current) = self.resources.get_mut(&holder) {
            current.release_host(&host);
            current.add_warning(warning);
        }
        if let Some(candidate) = self.resources.get_mut(key) {
            candidate.acquire_host(host.clone());
        }
        self.owners.insert(host, key.clone());
    }

    fn finish(
        self,
    ) -> (
        BTreeMap<String, Arc<Resource>>,
        BTreeMap<ResourceKey, Arc<Resource>>,
    ) {
        let resources = self
            .resources
            .into_iter()
            .map(|(key, resource)| (key, Arc::new(resource)))
            .collect::<BTreeMap<_, _>>();
        let hosts = self
            .owners
            .into_iter()
            .filter_map(|(host, key)| Some((host, resources.get(&key)?.clone())))
            .collect();
        (hosts, resources)
    }
}
