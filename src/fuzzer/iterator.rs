//! Unit Planning - Walk a contract and turn fuzzer cases into units
//!
//! Two iterators mirror the two ways a fuzzer targets a request:
//! [`FieldsIterator`] walks body fields declared by the request schema and
//! present in the baseline, [`HeadersIterator`] walks declared headers.
//! Operation-level fuzzers target the request as a whole.

use std::sync::{Arc, LazyLock};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::debug;

use crate::contract::schema::SchemaDescriptor;
use crate::contract::{Contract, ContractContext, HeaderSpec, Operation};

use super::config::FuzzConfig;
use super::executor::is_empty_payload;
use super::limits::FuzzerError;
use super::mutation::dictionary::Dictionary;
use super::path::{collect_paths, FieldPath};
use super::suite::{self, Case, FieldTarget, FuzzerDef, Generation, Planner};
use super::unit::{FuzzingUnit, UnitTarget};

/// Authentication headers left alone when `skip_auth_headers` is set
const AUTH_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "api-key",
    "cookie",
    "proxy-authorization",
    "x-auth-token",
];

/// Schema for fields of an operation with a payload but no schema
static UNTYPED: LazyLock<SchemaDescriptor> = LazyLock::new(SchemaDescriptor::any);

/// Whether a header carries credentials
pub fn is_auth_header(name: &str) -> bool {
    AUTH_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Body fields of one operation eligible for field fuzzers
pub struct FieldsIterator<'a> {
    operation: &'a Operation,
    context: &'a ContractContext,
    max_path_depth: usize,
}

impl<'a> FieldsIterator<'a> {
    pub fn new(operation: &'a Operation, context: &'a ContractContext, max_path_depth: usize) -> Self {
        Self {
            operation,
            context,
            max_path_depth,
        }
    }

    /// Declared fields present in this payload, minus discriminators and
    /// paths beyond the depth limit
    pub fn targets(&self) -> Vec<FieldTarget<'a>> {
        let operation = self.operation;
        let payload = operation.payload.as_ref();
        if is_empty_payload(payload) {
            debug!("Skipping fields of {}: empty payload", self.operation.label());
            return Vec::new();
        }

        let declared: Vec<(String, &'a SchemaDescriptor, bool, bool)> = match &operation.request_schema {
            Some(schema) => schema
                .flatten_fields()
                .into_iter()
                .map(|f| (f.path, f.schema, f.required, f.discriminator))
                .collect(),
            None => collect_paths(payload)
                .into_iter()
                .map(|path| (path, &*UNTYPED, false, false))
                .collect(),
        };

        let mut targets = Vec::new();
        for (raw, schema, required, discriminator) in declared {
            let path = match FieldPath::anchored(&raw, payload) {
                Ok(path) => path,
                Err(err) => {
                    debug!("Skipping field {}: {}", raw, err);
                    continue;
                }
            };
            if path.depth() > self.max_path_depth {
                debug!("Skipping field {}: deeper than {} segments", path, self.max_path_depth);
                continue;
            }
            if discriminator || self.context.is_discriminator(&path) {
                debug!("Skipping discriminator field {}", path);
                continue;
            }

            let Some(current) = path.resolve(payload).first().map(|r| r.value.clone()) else {
                debug!("Skipping field {}: not present in payload", path);
                continue;
            };

            targets.push(FieldTarget {
                path,
                schema,
                required,
                current,
            });
        }
        targets
    }
}

/// Declared headers of one operation eligible for header fuzzers
pub struct HeadersIterator<'a> {
    operation: &'a Operation,
    skip_auth: bool,
}

impl<'a> HeadersIterator<'a> {
    pub fn new(operation: &'a Operation, skip_auth: bool) -> Self {
        Self {
            operation,
            skip_auth,
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = &'a HeaderSpec> + '_ {
        self.operation.headers.iter().filter(move |header| {
            let skip = self.skip_auth && is_auth_header(&header.name);
            if skip {
                debug!("Skipping authentication header {}", header.name);
            }
            !skip
        })
    }
}

/// Selected fuzzers, in catalog order; unknown names are an error
pub fn select_fuzzers(config: &FuzzConfig) -> Result<Vec<&'static FuzzerDef>, FuzzerError> {
    if let Some(names) = &config.fuzzers {
        if let Some(unknown) = names.iter().find(|n| suite::find(n).is_none()) {
            return Err(FuzzerError::UnknownFuzzer(unknown.clone()));
        }
    }
    Ok(suite::BUILTIN_FUZZERS
        .iter()
        .filter(|def| config.selects(def.name))
        .collect())
}

/// Plan every unit for a contract, grouped by operation then fuzzer
pub fn plan_units(contract: &Contract, config: &FuzzConfig) -> Result<Vec<FuzzingUnit>, FuzzerError> {
    let fuzzers = select_fuzzers(config)?;
    let dictionary = Dictionary::builtin();
    let mut rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };

    let mut units = Vec::new();
    for operation in &contract.operations {
        let fields = FieldsIterator::new(operation, &contract.context, config.max_path_depth);
        let field_targets = fields.targets();
        let headers = HeadersIterator::new(operation, config.skip_auth_headers);

        for def in &fuzzers {
            let mut ctx = Generation {
                rng: &mut rng,
                dictionary: &dictionary,
                strict_types: config.strict_types,
            };
            let before = units.len();

            match def.planner {
                Planner::Fields(planner) => {
                    for field in &field_targets {
                        let target = UnitTarget::Field(field.path.clone());
                        push_cases(&mut units, def, operation, target, planner(field, &mut ctx));
                    }
                }
                Planner::Headers(planner) => {
                    for header in headers.targets() {
                        let target = UnitTarget::Header(header.name.clone());
                        push_cases(&mut units, def, operation, target, planner(header, &mut ctx));
                    }
                }
                Planner::Operation(planner) => {
                    let cases = planner(operation, &mut ctx);
                    push_cases(&mut units, def, operation, UnitTarget::Request, cases);
                }
            }

            debug!(
                "{} planned {} units for {}",
                def.name,
                units.len() - before,
                operation.label()
            );
        }
    }

    Ok(units)
}

fn push_cases(
    units: &mut Vec<FuzzingUnit>,
    def: &FuzzerDef,
    operation: &Arc<Operation>,
    target: UnitTarget,
    cases: Vec<Case>,
) {
    for case in cases {
        let mut unit = FuzzingUnit::new(
            def.name,
            Arc::clone(operation),
            target.clone(),
            case.strategy,
            case.expected,
        )
        .with_scenario(case.scenario);
        if let Some(check) = def.security {
            unit = unit.with_security(check);
        }
        units.push(unit);
    }
}
