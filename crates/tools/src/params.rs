//! Sorting call arguments into the parameter buckets a tool declares.

use ragweave_core::tool::{ParamBucket, ParameterBuckets, ToolAction};

/// Build the buckets for one action call.
///
/// Static values configured on the action are filled in first (a property
/// the model may fill keeps its static value only when the model left it
/// out). Each model argument then goes into every bucket that declares it as
/// model-fillable, or into `parameters` when no bucket declares it at all.
/// Arguments naming a fixed property are dropped.
pub fn build_parameters(action: &ToolAction, arguments: &serde_json::Value) -> ParameterBuckets {
    let args = arguments.as_object();
    let mut buckets = ParameterBuckets::default();

    for (bucket, schema) in action.schemas() {
        let Some(schema) = schema else { continue };
        for (name, prop) in &schema.properties {
            let Some(value) = &prop.value else { continue };
            let supplied = prop.filled_by_llm && args.is_some_and(|a| a.contains_key(name));
            if !supplied {
                buckets.bucket_mut(bucket).insert(name.clone(), value.clone());
            }
        }
    }

    let Some(args) = args else {
        return buckets;
    };

    for (name, value) in args {
        let mut declared = false;
        for (bucket, schema) in action.schemas() {
            let Some(prop) = schema.and_then(|s| s.properties.get(name)) else {
                continue;
            };
            declared = true;
            if prop.filled_by_llm {
                buckets.bucket_mut(bucket).insert(name.clone(), value.clone());
            } else {
                tracing::debug!(argument = %name, "Ignoring model value for fixed parameter");
            }
        }
        if !declared {
            buckets
                .bucket_mut(ParamBucket::Parameters)
                .insert(name.clone(), value.clone());
        }
    }

    buckets
}
