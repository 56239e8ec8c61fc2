//! Structural validation of Ingresses, VirtualServers and VirtualServerRoutes.
//!
//! Errors are formatted like Kubernetes field errors so that they read the
//! same way in object statuses as API server rejections do.

use ingress_controller_k8s_api::{
    ingress::{
        IngressExt, MergeableType, APP_PROTECT_LOG_CONF_ANNOTATION, APP_PROTECT_POLICY_ANNOTATION,
        JWT_KEY_ANNOTATION, MERGEABLE_INGRESS_TYPE_ANNOTATION,
    },
    virtual_server::{Action, PolicyReference, Split, Tls, Upstream},
    virtual_server_route::Subroute,
    Ingress, ResourceId, VirtualServer, VirtualServerRoute,
};
use regex::Regex;
use std::{
    collections::{BTreeSet, HashSet},
    fmt,
    sync::LazyLock,
};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("{field}: Required value{}", detail_suffix(.detail))]
    Required { field: String, detail: String },

    #[error("{field}: Invalid value: {value}: {detail}")]
    Invalid {
        field: String,
        value: String,
        detail: String,
    },

    #[error("{field}: Duplicate value: {value:?}")]
    Duplicate { field: String, value: String },

    #[error("{field}: Too many: {actual}: must have at most {max} items")]
    TooMany {
        field: String,
        actual: usize,
        max: usize,
    },

    #[error("{field}: Forbidden: {detail}")]
    Forbidden { field: String, detail: String },
}

/// An aggregate of field errors. A single error displays as itself; several
/// display as `[e1, e2]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, thiserror::Error)]
#[error("{}", Aggregate(.0))]
pub struct FieldErrors(pub Vec<FieldError>);

/// Validates objects before they are admitted to the configuration.
pub trait Validator: fmt::Debug + Send + Sync {
    fn validate_ingress(&self, ingress: &Ingress) -> Result<(), FieldErrors>;

    fn validate_virtual_server(&self, vs: &VirtualServer) -> Result<(), FieldErrors>;

    fn validate_virtual_server_route(&self, vsr: &VirtualServerRoute) -> Result<(), FieldErrors>;

    /// Checks that a route fits the VirtualServer route delegating `path` on
    /// `host` to it.
    fn validate_virtual_server_route_for_virtual_server(
        &self,
        vsr: &VirtualServerRoute,
        host: &str,
        path: &str,
    ) -> Result<(), FieldErrors> {
        validate_route_for_virtual_server(vsr, host, path)
    }
}

#[derive(Clone, Debug, Default)]
pub struct DefaultValidator {
    pub is_plus: bool,
    pub app_protect_enabled: bool,
    pub internal_routes_enabled: bool,
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {detail}")
    }
}

struct Aggregate<'a>(&'a [FieldError]);

impl fmt::Display for Aggregate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            [] => Ok(()),
            [err] => fmt::Display::fmt(err, f),
            errs => {
                f.write_str("[")?;
                for (i, err) in errs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(err, f)?;
                }
                f.write_str("]")
            }
        }
    }
}

// === impl FieldError ===

impl FieldError {
    pub fn required(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Required {
            field: field.into(),
            detail: detail.into(),
        }
    }

    /// An invalid string value, quoted in the message.
    pub fn invalid(field: impl Into<String>, value: &str, detail: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            value: format!("{value:?}"),
            detail: detail.into(),
        }
    }

    pub fn invalid_number(
        field: impl Into<String>,
        value: impl fmt::Display,
        detail: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            field: field.into(),
            value: value.to_string(),
            detail: detail.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Duplicate {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn too_many(field: impl Into<String>, actual: usize, max: usize) -> Self {
        Self::TooMany {
            field: field.into(),
            actual,
            max,
        }
    }

    pub fn forbidden(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Forbidden {
            field: field.into(),
            detail: detail.into(),
        }
    }
}

// === impl FieldErrors ===

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, err: FieldError) {
        self.0.push(err);
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Extend<FieldError> for FieldErrors {
    fn extend<T: IntoIterator<Item = FieldError>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl From<FieldError> for FieldErrors {
    fn from(err: FieldError) -> Self {
        Self(vec![err])
    }
}

// === impl DefaultValidator ===

impl Validator for DefaultValidator {
    fn validate_ingress(&self, ingress: &Ingress) -> Result<(), FieldErrors> {
        let mut errs = FieldErrors::default();
        self.validate_ingress_annotations(ingress, &mut errs);
        validate_ingress_rules(ingress, &mut errs);
        match ingress.mergeable_type() {
            Some(MergeableType::Master) => validate_master(ingress, &mut errs),
            Some(MergeableType::Minion) => validate_minion(ingress, &mut errs),
            None => {}
        }
        errs.into_result()
    }

    fn validate_virtual_server(&self, vs: &VirtualServer) -> Result<(), FieldErrors> {
        let mut errs = FieldErrors::default();
        validate_host(&vs.spec.host, "spec.host", &mut errs);
        if let Some(tls) = vs.spec.tls.as_ref() {
            validate_tls(tls, &mut errs);
        }
        validate_policies(&vs.spec.policies, "spec.policies", &mut errs);
        let upstreams = validate_upstreams(&vs.spec.upstreams, "spec.upstreams", &mut errs);

        let mut paths = HashSet::new();
        for (i, route) in vs.spec.routes.iter().enumerate() {
            let field = format!("spec.routes[{i}]");
            validate_route_path(&route.path, &format!("{field}.path"), &mut paths, &mut errs);
            validate_policies(&route.policies, &format!("{field}.policies"), &mut errs);

            let route_ref = route.route.as_deref().filter(|r| !r.is_empty());
            let fields_set = [
                route.action.is_some(),
                !route.splits.is_empty(),
                route_ref.is_some(),
            ]
            .into_iter()
            .filter(|set| *set)
            .count();
            if fields_set != 1 {
                errs.push(exactly_one_of(&field, fields_set, "`action`, `splits` or `route`"));
                continue;
            }

            if let Some(action) = route.action.as_ref() {
                validate_action(action, &format!("{field}.action"), &upstreams, &mut errs);
            } else if let Some(route_ref) = route_ref {
                validate_route_reference(route_ref, &format!("{field}.route"), &mut errs);
            } else {
                validate_splits(&route.splits, &format!("{field}.splits"), &upstreams, &mut errs);
            }
        }

        errs.into_result()
    }

    fn validate_virtual_server_route(&self, vsr: &VirtualServerRoute) -> Result<(), FieldErrors> {
        let mut errs = FieldErrors::default();
        validate_host(&vsr.spec.host, "spec.host", &mut errs);
        let upstreams = validate_upstreams(&vsr.spec.upstreams, "spec.upstreams", &mut errs);

        let mut paths = HashSet::new();
        for (i, subroute) in vsr.spec.subroutes.iter().enumerate() {
            let field = format!("spec.subroutes[{i}]");
            validate_subroute(subroute, &field, &upstreams, &mut paths, &mut errs);
        }

        errs.into_result()
    }
}

impl DefaultValidator {
    fn validate_ingress_annotations(&self, ingress: &Ingress, errs: &mut FieldErrors) {
        let Some(annotations) = ingress.metadata.annotations.as_ref() else {
            return;
        };
        let services = ingress
            .backend_services()
            .into_iter()
            .collect::<BTreeSet<_>>();

        for (name, checks) in ANNOTATION_CHECKS {
            let Some(value) = annotations.get(*name) else {
                continue;
            };
            let field = format!("annotations.{name}");
            // Checks run in order and stop at the first failure.
            for check in *checks {
                let err = match check {
                    Check::Required if value.is_empty() => Some(FieldError::required(&field, "")),
                    Check::PlusOnly if !self.is_plus => Some(FieldError::forbidden(
                        &field,
                        "annotation requires NGINX Plus",
                    )),
                    Check::AppProtectOnly if !self.app_protect_enabled => Some(
                        FieldError::forbidden(&field, "annotation requires AppProtect"),
                    ),
                    Check::InternalRoutesOnly if !self.internal_routes_enabled => {
                        Some(FieldError::forbidden(
                            &field,
                            "annotation requires Internal Routes enabled",
                        ))
                    }
                    Check::Bool if parse_bool(value).is_none() => {
                        Some(FieldError::invalid(&field, value, "must be a boolean"))
                    }
                    Check::Int if value.parse::<i32>().is_err() => {
                        Some(FieldError::invalid(&field, value, "must be an integer"))
                    }
                    Check::Uint64 if value.parse::<u64>().is_err() => Some(FieldError::invalid(
                        &field,
                        value,
                        "must be a non-negative integer",
                    )),
                    Check::PortList if !is_port_list(value) => Some(FieldError::invalid(
                        &field,
                        value,
                        "must be a comma-separated list of port numbers",
                    )),
                    Check::ServiceList => {
                        let unknown = value
                            .split(',')
                            .map(str::trim)
                            .filter(|svc| !services.contains(svc))
                            .collect::<Vec<_>>();
                        (!unknown.is_empty()).then(|| {
                            FieldError::invalid(
                                &field,
                                value,
                                format!(
                                    "must be a comma-separated list of services. The following services were not found: {}",
                                    unknown.join(",")
                                ),
                            )
                        })
                    }
                    Check::MergeableType if value.parse::<MergeableType>().is_err() => {
                        Some(FieldError::invalid(
                            &field,
                            value,
                            "must be one of: 'master' or 'minion'",
                        ))
                    }
                    Check::Related(related, rule) => match annotations.get(*related) {
                        None => Some(FieldError::forbidden(
                            &field,
                            format!("related annotation {related}: must be set"),
                        )),
                        Some(v) => rule.check(v).err().map(|e| {
                            FieldError::forbidden(&field, format!("related annotation {related}: {e}"))
                        }),
                    },
                    _ => None,
                };
                if let Some(err) = err {
                    errs.push(err);
                    break;
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum Check {
    Required,
    PlusOnly,
    AppProtectOnly,
    InternalRoutesOnly,
    Bool,
    Int,
    Uint64,
    PortList,
    ServiceList,
    MergeableType,
    Related(&'static str, RelatedRule),
}

#[derive(Copy, Clone, Debug)]
enum RelatedRule {
    IsBool,
    IsTrue,
}

impl RelatedRule {
    fn check(&self, value: &str) -> Result<(), &'static str> {
        match (self, parse_bool(value)) {
            (_, None) => Err("must be a boolean"),
            (Self::IsTrue, Some(false)) => Err("must be true"),
            _ => Ok(()),
        }
    }
}

/// Per-annotation checks, sorted by annotation name.
const ANNOTATION_CHECKS: &[(&str, &[Check])] = &[
    (
        "appprotect.f5.com/app-protect-enable",
        &[Check::AppProtectOnly, Check::Required, Check::Bool],
    ),
    (
        APP_PROTECT_POLICY_ANNOTATION,
        &[Check::AppProtectOnly, Check::Required],
    ),
    (
        APP_PROTECT_LOG_CONF_ANNOTATION,
        &[Check::AppProtectOnly, Check::Required],
    ),
    (
        "appprotect.f5.com/app-protect-security-log-enable",
        &[Check::AppProtectOnly, Check::Required, Check::Bool],
    ),
    ("ingress.kubernetes.io/ssl-redirect", &[Check::Required, Check::Bool]),
    (
        "nginx.com/health-checks",
        &[Check::PlusOnly, Check::Required, Check::Bool],
    ),
    (
        "nginx.com/health-checks-mandatory",
        &[
            Check::PlusOnly,
            Check::Related("nginx.com/health-checks", RelatedRule::IsTrue),
            Check::Required,
            Check::Bool,
        ],
    ),
    (
        "nginx.com/health-checks-mandatory-queue",
        &[
            Check::PlusOnly,
            Check::Related("nginx.com/health-checks-mandatory", RelatedRule::IsTrue),
            Check::Required,
            Check::Uint64,
        ],
    ),
    (JWT_KEY_ANNOTATION, &[Check::PlusOnly]),
    ("nginx.com/jwt-login-url", &[Check::PlusOnly]),
    ("nginx.com/jwt-realm", &[Check::PlusOnly]),
    ("nginx.com/jwt-token", &[Check::PlusOnly]),
    ("nginx.com/slow-start", &[Check::PlusOnly, Check::Required]),
    (
        "nginx.com/sticky-cookie-services",
        &[Check::PlusOnly, Check::Required],
    ),
    ("nginx.org/grpc-services", &[Check::Required, Check::ServiceList]),
    ("nginx.org/hsts", &[Check::Required, Check::Bool]),
    (
        "nginx.org/hsts-behind-proxy",
        &[
            Check::Related("nginx.org/hsts", RelatedRule::IsBool),
            Check::Required,
            Check::Bool,
        ],
    ),
    (
        "nginx.org/hsts-include-subdomains",
        &[
            Check::Related("nginx.org/hsts", RelatedRule::IsBool),
            Check::Required,
            Check::Bool,
        ],
    ),
    ("nginx.org/keepalive", &[Check::Required, Check::Int]),
    ("nginx.org/listen-ports", &[Check::Required, Check::PortList]),
    ("nginx.org/listen-ports-ssl", &[Check::Required, Check::PortList]),
    ("nginx.org/max-conns", &[Check::Required, Check::Int]),
    ("nginx.org/max-fails", &[Check::Required, Check::Int]),
    (
        MERGEABLE_INGRESS_TYPE_ANNOTATION,
        &[Check::Required, Check::MergeableType],
    ),
    ("nginx.org/proxy-buffering", &[Check::Required, Check::Bool]),
    ("nginx.org/redirect-to-https", &[Check::Required, Check::Bool]),
    ("nginx.org/ssl-services", &[Check::Required, Check::ServiceList]),
    (
        "nginx.org/websocket-services",
        &[Check::Required, Check::ServiceList],
    ),
    (
        "nsm.nginx.com/internal-route",
        &[Check::InternalRoutesOnly, Check::Required, Check::Bool],
    ),
];

/// Accepts the same spellings as Go's `strconv.ParseBool`, which users of the
/// annotations are accustomed to.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn is_port_list(value: &str) -> bool {
    value
        .split(',')
        .all(|port| matches!(port.trim().parse::<u16>(), Ok(p) if p > 0))
}

fn validate_ingress_rules(ingress: &Ingress, errs: &mut FieldErrors) {
    let rules = ingress.rules();
    if rules.is_empty() {
        errs.push(FieldError::required("spec.rules", ""));
        return;
    }

    let mut hosts = HashSet::new();
    for (i, rule) in rules.iter().enumerate() {
        let field = format!("spec.rules[{i}].host");
        match rule.host.as_deref().filter(|h| !h.is_empty()) {
            None => errs.push(FieldError::required(field, "")),
            Some(host) if !hosts.insert(host) => errs.push(FieldError::duplicate(field, host)),
            Some(_) => {}
        }
    }
}

fn validate_master(ingress: &Ingress, errs: &mut FieldErrors) {
    let rules = ingress.rules();
    if rules.len() != 1 {
        errs.push(FieldError::too_many("spec.rules", rules.len(), 1));
        return;
    }
    let paths = rules[0].http.as_ref().map_or(0, |http| http.paths.len());
    if paths > 0 {
        errs.push(FieldError::too_many("spec.rules[0].http.paths", paths, 0));
    }
}

fn validate_minion(ingress: &Ingress, errs: &mut FieldErrors) {
    let tls = ingress.tls();
    if !tls.is_empty() {
        errs.push(FieldError::too_many("spec.tls", tls.len(), 0));
    }

    let rules = ingress.rules();
    if rules.len() != 1 {
        errs.push(FieldError::too_many("spec.rules", rules.len(), 1));
        return;
    }
    let paths = rules[0].http.as_ref().map_or(0, |http| http.paths.len());
    if paths == 0 {
        errs.push(FieldError::required(
            "spec.rules[0].http.paths",
            "must include at least one path",
        ));
    }
}

static DNS1123_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("DNS-1123 subdomain pattern must compile")
});

static DNS1035_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]([-a-z0-9]*[a-z0-9])?$").expect("DNS-1035 label pattern must compile")
});

static PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[^\s{};]*$").expect("path pattern must compile"));

fn is_dns1123_subdomain(value: &str) -> bool {
    value.len() <= 253 && DNS1123_SUBDOMAIN.is_match(value)
}

fn validate_host(host: &str, field: &str, errs: &mut FieldErrors) {
    if host.is_empty() {
        errs.push(FieldError::required(field, ""));
    } else if !is_dns1123_subdomain(host) {
        errs.push(FieldError::invalid(
            field,
            host,
            "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character",
        ));
    }
}

fn validate_tls(tls: &Tls, errs: &mut FieldErrors) {
    let Some(redirect) = tls.redirect.as_ref().filter(|r| r.enable) else {
        return;
    };
    if let Some(code) = redirect.code {
        if !is_redirect_code(code) {
            errs.push(FieldError::invalid_number(
                "spec.tls.redirect.code",
                code,
                "status code out of accepted range. accepted values are '301', '302', '307', '308'",
            ));
        }
    }
    if let Some(based_on) = redirect.based_on.as_deref() {
        if based_on != "scheme" && based_on != "x-forwarded-proto" {
            errs.push(FieldError::invalid(
                "spec.tls.redirect.basedOn",
                based_on,
                "accepted values are 'scheme', 'x-forwarded-proto'",
            ));
        }
    }
}

fn is_redirect_code(code: u16) -> bool {
    matches!(code, 301 | 302 | 307 | 308)
}

fn validate_policies(policies: &[PolicyReference], field: &str, errs: &mut FieldErrors) {
    let mut seen = HashSet::new();
    for (i, policy) in policies.iter().enumerate() {
        let field = format!("{field}[{i}]");
        if policy.name.is_empty() {
            errs.push(FieldError::required(format!("{field}.name"), ""));
            continue;
        }
        // Namespaces are resolved against a fixed placeholder so that an
        // omitted namespace only collides with another omitted one.
        let id = policy.resolve("");
        if !seen.insert(id.clone()) {
            errs.push(FieldError::duplicate(field, policy_display(&id)));
        }
    }
}

fn policy_display(id: &ResourceId) -> String {
    if id.namespace.is_empty() {
        id.name.clone()
    } else {
        id.to_string()
    }
}

/// Validates upstreams and returns the names of those declared.
fn validate_upstreams<'a>(
    upstreams: &'a [Upstream],
    field: &str,
    errs: &mut FieldErrors,
) -> HashSet<&'a str> {
    let mut names = HashSet::new();
    for (i, upstream) in upstreams.iter().enumerate() {
        let field = format!("{field}[{i}]");
        let name_field = format!("{field}.name");
        if upstream.name.is_empty() {
            errs.push(FieldError::required(name_field, ""));
        } else if upstream.name.len() > 63 || !DNS1035_LABEL.is_match(&upstream.name) {
            errs.push(FieldError::invalid(
                name_field,
                &upstream.name,
                "a DNS-1035 label must consist of lower case alphanumeric characters or '-', start with an alphabetic character, and end with an alphanumeric character",
            ));
        } else if !names.insert(upstream.name.as_str()) {
            errs.push(FieldError::duplicate(name_field, upstream.name.clone()));
        }

        if upstream.service.is_empty() {
            errs.push(FieldError::required(format!("{field}.service"), ""));
        }
        if upstream.port == 0 {
            errs.push(FieldError::invalid_number(
                format!("{field}.port"),
                upstream.port,
                "must be between 1 and 65535, inclusive",
            ));
        }
    }
    names
}

fn validate_route_path<'a>(
    path: &'a str,
    field: &str,
    seen: &mut HashSet<&'a str>,
    errs: &mut FieldErrors,
) {
    if path.is_empty() {
        errs.push(FieldError::required(field, ""));
        return;
    }

    if let Some(regex) = path.strip_prefix('~') {
        let pattern = regex.trim_start_matches('*').trim_start();
        if pattern.is_empty() || Regex::new(pattern).is_err() {
            errs.push(FieldError::invalid(field, path, "must be a valid regular expression"));
            return;
        }
    } else {
        let exact = path.strip_prefix('=').unwrap_or(path);
        if !PATH.is_match(exact) {
            errs.push(FieldError::invalid(
                field,
                path,
                "must start with '/', '~' or '=' and must not include any whitespace character, `{`, `}` or `;`",
            ));
            return;
        }
    }

    if !seen.insert(path) {
        errs.push(FieldError::duplicate(field, path));
    }
}

fn exactly_one_of(field: &str, set: usize, options: &str) -> FieldError {
    let detail = format!("must specify exactly one of: {options}");
    if set == 0 {
        FieldError::required(field, detail)
    } else {
        FieldError::forbidden(field, detail)
    }
}

fn validate_action(action: &Action, field: &str, upstreams: &HashSet<&str>, errs: &mut FieldErrors) {
    let fields_set = [
        action.pass.is_some(),
        action.redirect.is_some(),
        action.r#return.is_some(),
    ]
    .into_iter()
    .filter(|set| *set)
    .count();
    if fields_set != 1 {
        errs.push(exactly_one_of(field, fields_set, "`pass`, `redirect` or `return`"));
        return;
    }

    if let Some(pass) = action.pass.as_deref() {
        if pass.is_empty() {
            errs.push(FieldError::required(format!("{field}.pass"), ""));
        } else if !upstreams.contains(pass) {
            errs.push(FieldError::invalid(
                format!("{field}.pass"),
                pass,
                "must specify an existing upstream",
            ));
        }
    }

    if let Some(redirect) = action.redirect.as_ref() {
        if redirect.url.is_empty() {
            errs.push(FieldError::required(format!("{field}.redirect.url"), ""));
        }
        if let Some(code) = redirect.code.filter(|c| !is_redirect_code(*c)) {
            errs.push(FieldError::invalid_number(
                format!("{field}.redirect.code"),
                code,
                "status code out of accepted range. accepted values are '301', '302', '307', '308'",
            ));
        }
    }

    if let Some(code) = action
        .r#return
        .as_ref()
        .and_then(|ret| ret.code)
        .filter(|c| !(200..=599).contains(c))
    {
        errs.push(FieldError::invalid_number(
            format!("{field}.return.code"),
            code,
            "must be between 200 and 599",
        ));
    }
}

fn validate_splits(splits: &[Split], field: &str, upstreams: &HashSet<&str>, errs: &mut FieldErrors) {
    if splits.len() < 2 {
        errs.push(FieldError::required(field, "must include at least 2 splits"));
        return;
    }

    let mut total = 0u64;
    for (i, split) in splits.iter().enumerate() {
        let split_field = format!("{field}[{i}]");
        if !(1..=99).contains(&split.weight) {
            errs.push(FieldError::invalid_number(
                format!("{split_field}.weight"),
                split.weight,
                "must be in the range 1..99",
            ));
        }
        total += u64::from(split.weight);

        match split.action.as_ref() {
            Some(action) => validate_action(action, &format!("{split_field}.action"), upstreams, errs),
            None => errs.push(FieldError::required(format!("{split_field}.action"), "")),
        }
    }

    if total != 100 {
        errs.push(FieldError::invalid_number(
            field,
            total,
            "the sum of the weights of all splits must be equal to 100",
        ));
    }
}

fn validate_route_reference(route: &str, field: &str, errs: &mut FieldErrors) {
    let valid = match route.split_once('/') {
        Some((ns, name)) => is_dns1123_subdomain(ns) && is_dns1123_subdomain(name),
        None => is_dns1123_subdomain(route),
    };
    if !valid {
        errs.push(FieldError::invalid(
            field,
            route,
            "must be the name of a VirtualServerRoute, optionally qualified as <namespace>/<name>",
        ));
    }
}

fn validate_subroute<'a>(
    subroute: &'a Subroute,
    field: &str,
    upstreams: &HashSet<&str>,
    paths: &mut HashSet<&'a str>,
    errs: &mut FieldErrors,
) {
    validate_route_path(&subroute.path, &format!("{field}.path"), paths, errs);
    validate_policies(&subroute.policies, &format!("{field}.policies"), errs);

    if subroute.route.is_some() {
        errs.push(FieldError::forbidden(format!("{field}.route"), "is not allowed"));
        return;
    }

    let fields_set = [subroute.action.is_some(), !subroute.splits.is_empty()]
        .into_iter()
        .filter(|set| *set)
        .count();
    if fields_set != 1 {
        errs.push(exactly_one_of(field, fields_set, "`action` or `splits`"));
        return;
    }

    match subroute.action.as_ref() {
        Some(action) => validate_action(action, &format!("{field}.action"), upstreams, errs),
        None => validate_splits(&subroute.splits, &format!("{field}.splits"), upstreams, errs),
    }
}

fn is_regex_or_exact(path: &str) -> bool {
    path.starts_with('~') || path.starts_with('=')
}

/// Checks that a VirtualServerRoute can serve the VirtualServer route that
/// delegates `vs_path` on `vs_host` to it.
pub fn validate_route_for_virtual_server(
    vsr: &VirtualServerRoute,
    vs_host: &str,
    vs_path: &str,
) -> Result<(), FieldErrors> {
    let mut errs = FieldErrors::default();

    if vsr.spec.host != vs_host {
        errs.push(FieldError::invalid(
            "spec.host",
            &vsr.spec.host,
            format!("must be equal to '{vs_host}'"),
        ));
    }

    let subroutes = &vsr.spec.subroutes;
    if is_regex_or_exact(vs_path) {
        if subroutes.len() != 1 {
            errs.push(FieldError::invalid_number(
                "spec.subroutes",
                subroutes.len(),
                "must have only one subroute if regex match or exact match are being used",
            ));
        } else if subroutes[0].path != vs_path {
            errs.push(FieldError::invalid(
                "spec.subroutes[0].path",
                &subroutes[0].path,
                format!("must have the same path as the VirtualServer route '{vs_path}'"),
            ));
        }
    } else {
        for (i, subroute) in subroutes.iter().enumerate() {
            if !subroute.path.starts_with(vs_path) {
                errs.push(FieldError::invalid(
                    format!("spec.subroutes[{i}].path"),
                    &subroute.path,
                    format!("must start with '{vs_path}'"),
                ));
            }
        }
    }

    errs.into_result()
}
