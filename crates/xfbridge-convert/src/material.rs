//! Material conversion between scene properties and chunks

use xfbridge_core::{Error, Result};
use xfbridge_nucc::nud::MAX_MATERIALS;
use xfbridge_nucc::{Container, MaterialChunk, NudMaterial, NudMaterialProperty, TextureGroup};

use crate::scene::{
    HostMaterial, NudMaterialProps, NudPropertyProps, TextureGroupProps, TextureRef, XfbinMaterialProps,
    MATERIAL_PREFIX,
};

/// Parse a hex string as shown in the scene (`"F00A"`, `"0xF00A"`, empty is 0)
pub fn parse_hex(text: &str) -> Result<u32> {
    let digits = text.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);

    if digits.is_empty() {
        return Ok(0);
    }

    u32::from_str_radix(digits, 16).map_err(|e| Error::invalid_data(format!("'{text}' is not a hex value: {e}")))
}

/// Format a value as an upper-case hex string of `2 * bytes` digits
pub fn format_hex(value: u32, bytes: usize) -> String {
    format!("{value:0width$X}", width = bytes * 2)
}

/// Build NUD materials from mesh properties; at most [`MAX_MATERIALS`] are kept
pub fn export_nud_materials(props: &[NudMaterialProps]) -> Result<Vec<NudMaterial>> {
    props
        .iter()
        .take(MAX_MATERIALS)
        .map(|m| {
            Ok(NudMaterial {
                flags: parse_hex(&m.material_id)?,
                source_factor: m.source_factor,
                dest_factor: m.dest_factor,
                alpha_test: m.alpha_test,
                alpha_function: m.alpha_function,
                ref_alpha: m.ref_alpha,
                cull_mode: m.cull_mode,
                unk1: m.unk1,
                unk2: m.unk2,
                zbuffer_offset: m.zbuffer_offset,
                textures: m.textures.clone(),
                properties: m
                    .material_props
                    .iter()
                    .map(|p| NudMaterialProperty {
                        name: p.prop_name.clone(),
                        values: p.values.iter().take(p.count).copied().collect(),
                    })
                    .collect(),
            })
        })
        .collect()
}

/// Mesh material properties from NUD materials
pub fn import_nud_materials(materials: &[NudMaterial]) -> Vec<NudMaterialProps> {
    materials
        .iter()
        .map(|m| NudMaterialProps {
            material_id: format_hex(m.flags, 4),
            source_factor: m.source_factor,
            dest_factor: m.dest_factor,
            alpha_test: m.alpha_test,
            alpha_function: m.alpha_function,
            ref_alpha: m.ref_alpha,
            cull_mode: m.cull_mode,
            unk1: m.unk1,
            unk2: m.unk2,
            zbuffer_offset: m.zbuffer_offset,
            textures: m.textures.clone(),
            material_props: m
                .properties
                .iter()
                .map(|p| NudPropertyProps {
                    prop_name: p.name.clone(),
                    count: p.values.len(),
                    values: p.values.clone(),
                })
                .collect(),
        })
        .collect()
}

/// Build a material chunk, resolving its textures to texture chunks
///
/// Textures not yet in the container get a data-less chunk that a texture
/// page can fill later.
pub fn export_xfbin_material(
    props: &XfbinMaterialProps,
    path: &str,
    container: &mut Container,
) -> Result<MaterialChunk> {
    let mut chunk = MaterialChunk::new(path, props.material_name.clone());
    chunk.field02 = props.field02;
    chunk.field04 = props.field04;
    chunk.format = parse_hex(&props.float_format)?;
    chunk.floats = props.floats.clone();

    chunk.texture_groups = props
        .texture_groups
        .iter()
        .map(|group| TextureGroup {
            unk: group.flag,
            textures: group
                .textures
                .iter()
                .map(|t| container.intern_texture(&t.path, &t.texture_name))
                .collect(),
        })
        .collect();

    Ok(chunk)
}

/// Scene properties of a material chunk
pub fn import_xfbin_material(chunk: &MaterialChunk, container: &Container) -> Result<XfbinMaterialProps> {
    let texture_groups = chunk
        .texture_groups
        .iter()
        .map(|group| {
            let textures = group
                .textures
                .iter()
                .map(|&id| {
                    container.texture(id).map(|t| TextureRef {
                        path: t.path.clone(),
                        texture_name: t.name.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(TextureGroupProps {
                flag: group.unk,
                textures,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(XfbinMaterialProps {
        material_name: chunk.name.clone(),
        field02: chunk.field02,
        field04: chunk.field04,
        float_format: format_hex(chunk.format, 1),
        floats: chunk.floats.clone(),
        texture_groups,
    })
}

/// Host rendering material mirroring a container material
pub fn host_material(props: &XfbinMaterialProps) -> HostMaterial {
    let base_texture_candidates = props
        .texture_groups
        .first()
        .and_then(|g| g.textures.first())
        .map(|t| {
            let name = &t.texture_name;
            vec![name.clone(), format!("{name}.dds"), format!("{name}.png")]
        })
        .unwrap_or_default();

    HostMaterial {
        name: format!("{MATERIAL_PREFIX}{}", props.material_name),
        xfbin_material: props.material_name.clone(),
        base_texture_candidates,
    }
}

/// Shorten a material name for display by removing the clump name prefix
///
/// A trailing `_f` on the clump name is ignored when matching.
pub fn display_material_name<'a>(material: &'a str, clump_name: &str) -> &'a str {
    let clump_name = clump_name.strip_suffix("_f").unwrap_or(clump_name);
    material
        .strip_prefix(clump_name)
        .map_or(material, |rest| rest.trim_matches(|c| c == ' ' || c == '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        assert_eq!(parse_hex("F00A").unwrap(), 0xF00A);
        assert_eq!(parse_hex("0x10").unwrap(), 0x10);
        assert_eq!(parse_hex("").unwrap(), 0);
        assert!(parse_hex("zz").is_err());
        assert_eq!(format_hex(0xF00A, 4), "0000F00A");
        assert_eq!(format_hex(0xCA, 1), "CA");
    }

    #[test]
    fn test_property_values_truncated_to_count() {
        let props = vec![NudMaterialProps {
            material_id: "94010161".to_string(),
            material_props: vec![NudPropertyProps {
                prop_name: "NU_colorSamplerUV".to_string(),
                count: 2,
                values: vec![1.0, 1.0, 0.0, 0.0],
            }],
            ..NudMaterialProps::default()
        }];

        let materials = export_nud_materials(&props).unwrap();
        assert_eq!(materials[0].flags, 0x9401_0161);
        assert_eq!(materials[0].properties[0].values, vec![1.0, 1.0]);
    }

    #[test]
    fn test_only_four_nud_materials() {
        let props = vec![NudMaterialProps::default(); 6];
        assert_eq!(export_nud_materials(&props).unwrap().len(), MAX_MATERIALS);
    }

    #[test]
    fn test_material_textures_interned() {
        let mut container = Container::new();
        let props = XfbinMaterialProps {
            material_name: "1nrtbod1_skin".to_string(),
            float_format: "CA".to_string(),
            texture_groups: vec![TextureGroupProps {
                flag: 0,
                textures: vec![TextureRef {
                    path: "c/1nrt/tex/1nrtbod1.nut".to_string(),
                    texture_name: "1nrtbod1".to_string(),
                }],
            }],
            ..XfbinMaterialProps::default()
        };

        let chunk = export_xfbin_material(&props, "c/1nrt/max/1nrtbod1.max", &mut container).unwrap();
        assert_eq!(chunk.format, 0xCA);
        assert_eq!(container.len(), 1);

        let id = chunk.base_texture().unwrap();
        assert!(!container.texture(id).unwrap().has_data());

        let back = import_xfbin_material(&chunk, &container).unwrap();
        assert_eq!(back.texture_groups, props.texture_groups);
        assert_eq!(back.float_format, "CA");
    }

    #[test]
    fn test_host_material_candidates() {
        let props = XfbinMaterialProps {
            material_name: "skin".to_string(),
            texture_groups: vec![TextureGroupProps {
                flag: 0,
                textures: vec![TextureRef {
                    path: String::new(),
                    texture_name: "body".to_string(),
                }],
            }],
            ..XfbinMaterialProps::default()
        };

        let host = host_material(&props);
        assert_eq!(host.name, "[XFBIN] skin");
        assert_eq!(host.base_texture_candidates, vec!["body", "body.dds", "body.png"]);
    }

    #[test]
    fn test_display_material_name() {
        assert_eq!(display_material_name("1jnt01_f_skin", "1jnt01_f"), "f_skin");
        assert_eq!(display_material_name("1jnt01 body", "1jnt01"), "body");
        assert_eq!(display_material_name("other", "1jnt01"), "other");
    }
}
