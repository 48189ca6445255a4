use tracing::debug;

use crate::types::Uniform;

/// Carries user-edited values from `previous` into a freshly reflected list.
///
/// An entry keeps its predecessor's value only when both name and type match
/// exactly. Renamed or retyped parameters restart from zero and entries that
/// vanished from the scene are dropped along with their values.
pub fn merge(previous: &[Uniform], mut fresh: Vec<Uniform>) -> Vec<Uniform> {
    for uniform in &mut fresh {
        match previous
            .iter()
            .find(|candidate| candidate.same_declaration(uniform))
        {
            Some(predecessor) => uniform.value = predecessor.value,
            None => debug!(uniform = %uniform.name, ty = %uniform.ty, "new scene parameter"),
        }
    }
    fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BindingSlot, UniformType, UniformValue};

    fn with_value(name: &str, ty: UniformType, value: UniformValue) -> Uniform {
        let mut uniform = Uniform::new(name, ty);
        uniform.value = value;
        uniform
    }

    #[test]
    fn copies_values_for_matching_name_and_type() {
        let previous = vec![
            with_value("glow", UniformType::Float, UniformValue::Float([0.8, 0.0, 0.0, 0.0])),
            with_value("cells", UniformType::IVec2, UniformValue::Int([3, 4, 0, 0])),
        ];
        let fresh = vec![
            Uniform::new("cells", UniformType::IVec2),
            Uniform::new("glow", UniformType::Float),
        ];

        let merged = merge(&previous, fresh);
        assert_eq!(merged[0].value, UniformValue::Int([3, 4, 0, 0]));
        assert_eq!(merged[1].value, UniformValue::Float([0.8, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn renamed_or_retyped_parameters_restart_at_zero() {
        let previous = vec![
            with_value("glow", UniformType::Float, UniformValue::Float([0.8, 0.0, 0.0, 0.0])),
            with_value("tint", UniformType::Vec3, UniformValue::Float([1.0, 0.5, 0.2, 0.0])),
        ];
        let fresh = vec![
            Uniform::new("glow2", UniformType::Float),
            Uniform::new("tint", UniformType::Vec4),
        ];

        let merged = merge(&previous, fresh);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].value, UniformValue::Float([0.0; 4]));
        assert_eq!(merged[1].value, UniformValue::Float([0.0; 4]));
    }

    #[test]
    fn merge_of_identical_generation_is_identity_on_values() {
        let previous = vec![
            with_value("a", UniformType::Bool, UniformValue::Bool([true, false, false, false])),
            with_value("b", UniformType::UVec2, UniformValue::Int([7, 9, 0, 0])),
            with_value("c", UniformType::DVec3, UniformValue::Float([1.5, -2.0, 3.25, 0.0])),
        ];
        let fresh: Vec<_> = previous
            .iter()
            .map(|uniform| Uniform::new(uniform.name.clone(), uniform.ty))
            .collect();

        let merged = merge(&previous, fresh);
        let values: Vec<_> = merged.iter().map(|uniform| uniform.value).collect();
        let expected: Vec<_> = previous.iter().map(|uniform| uniform.value).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn merge_leaves_slots_alone() {
        let mut previous = with_value("glow", UniformType::Float, UniformValue::Float([0.3; 4]));
        previous.slot = BindingSlot::Resolved(7);
        let merged = merge(&[previous], vec![Uniform::new("glow", UniformType::Float)]);
        assert_eq!(merged[0].slot, BindingSlot::Unresolved);
    }
}
