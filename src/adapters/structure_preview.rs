//! Built-in structure visualizer for XYZ and POSCAR files.
//!
//! Produces an XYZ model for the browser viewer plus formula, composition and
//! cell metadata. Formats it cannot read are reported as unavailable.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::domain::{ElementCount, LatticeParameters, Visualization, VisualizerError, VisualizerPort};

type Vec3 = [f64; 3];

#[derive(Debug, Clone, PartialEq)]
struct Structure {
    symbols: Vec<String>,
    positions: Vec<Vec3>,
    cell: Option<[Vec3; 3]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Xyz,
    Poscar,
    Cif,
}

fn detect_format(file_name: &str) -> Option<Format> {
    let lowered = file_name.to_lowercase();
    if lowered.ends_with(".xyz") {
        Some(Format::Xyz)
    } else if lowered.ends_with(".cif") {
        Some(Format::Cif)
    } else if lowered.ends_with(".vasp")
        || lowered.ends_with(".poscar")
        || lowered.contains("poscar")
        || lowered.contains("contcar")
    {
        Some(Format::Poscar)
    } else {
        None
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StructurePreview;

impl StructurePreview {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VisualizerPort for StructurePreview {
    async fn render(&self, path: &Path) -> Result<Visualization, VisualizerError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let format = match detect_format(&file_name) {
            Some(Format::Cif) => {
                return Err(VisualizerError::Unavailable(
                    "CIF files are not supported by the built-in previewer".to_string(),
                ))
            }
            Some(format) => format,
            None => {
                return Err(VisualizerError::Unavailable(format!(
                    "Unrecognized structure format: {}",
                    file_name
                )))
            }
        };

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| VisualizerError::Failed(format!("{}: {}", path.display(), e)))?;

        let structure = match format {
            Format::Xyz => parse_xyz(&text),
            _ => parse_poscar(&text),
        }
        .map_err(VisualizerError::Failed)?;

        tracing::debug!("Rendered {} ({} atoms)", file_name, structure.symbols.len());
        Ok(describe(&structure, &file_name))
    }
}

fn describe(structure: &Structure, file_name: &str) -> Visualization {
    let mut model = format!("{}\nGenerated from {}\n", structure.symbols.len(), file_name);
    for (symbol, [x, y, z]) in structure.symbols.iter().zip(&structure.positions) {
        let _ = writeln!(model, "{} {:.6} {:.6} {:.6}", symbol, x, y, z);
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for symbol in &structure.symbols {
        *counts.entry(symbol.as_str()).or_default() += 1;
    }

    Visualization {
        file_name: file_name.to_string(),
        format: "xyz".to_string(),
        model,
        formula: hill_formula(&counts),
        atom_count: structure.symbols.len(),
        composition: counts
            .iter()
            .map(|(symbol, count)| ElementCount {
                symbol: symbol.to_string(),
                count: *count,
            })
            .collect(),
        lattice: structure.cell.as_ref().map(lattice_parameters),
        volume: structure.cell.as_ref().map(|cell| det(cell).abs()),
    }
}

/// Carbon first, then hydrogen, then the rest alphabetically; without
/// carbon everything is alphabetical.
fn hill_formula(counts: &BTreeMap<&str, usize>) -> String {
    let mut order: Vec<&str> = Vec::with_capacity(counts.len());
    if counts.contains_key("C") {
        order.push("C");
        if counts.contains_key("H") {
            order.push("H");
        }
    }
    let rest: Vec<&str> = counts
        .keys()
        .copied()
        .filter(|s| !order.contains(s))
        .collect();
    order.extend(rest);

    order
        .iter()
        .map(|symbol| match counts[symbol] {
            1 => symbol.to_string(),
            n => format!("{}{}", symbol, n),
        })
        .collect()
}

fn parse_f64(token: &str, what: &str) -> Result<f64, String> {
    token
        .parse::<f64>()
        .map_err(|_| format!("Invalid {}: '{}'", what, token))
}

fn parse_vec3(line: &str, what: &str) -> Result<Vec3, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(format!("Expected three numbers for {}, got '{}'", what, line.trim()));
    }
    Ok([
        parse_f64(tokens[0], what)?,
        parse_f64(tokens[1], what)?,
        parse_f64(tokens[2], what)?,
    ])
}

fn parse_xyz(text: &str) -> Result<Structure, String> {
    let mut lines = text.lines();
    let count_line = lines.next().ok_or("Empty XYZ file")?;
    let count: usize = count_line
        .trim()
        .parse()
        .map_err(|_| format!("Invalid atom count: '{}'", count_line.trim()))?;
    let comment = lines.next().unwrap_or_default();

    // The count comes from the file; never trust it beyond the lines present.
    let available = lines.clone().count();
    if count > available {
        return Err(format!("Expected {} atoms, found {}", count, available));
    }

    let mut symbols = Vec::with_capacity(count);
    let mut positions = Vec::with_capacity(count);
    for i in 0..count {
        let line = lines
            .next()
            .ok_or_else(|| format!("Expected {} atoms, found {}", count, i))?;
        let (symbol, rest) = line
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| format!("Malformed atom line: '{}'", line.trim()))?;
        symbols.push(symbol.to_string());
        positions.push(parse_vec3(rest, "atom position")?);
    }

    Ok(Structure {
        symbols,
        positions,
        cell: extended_xyz_lattice(comment),
    })
}

/// `Lattice="ax ay az bx by bz cx cy cz"` from an extended XYZ comment line.
fn extended_xyz_lattice(comment: &str) -> Option<[Vec3; 3]> {
    let start = comment.find("Lattice=\"")? + "Lattice=\"".len();
    let end = start + comment[start..].find('"')?;
    let values: Vec<f64> = comment[start..end]
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match values.as_slice() {
        [a0, a1, a2, b0, b1, b2, c0, c1, c2] => Some([[*a0, *a1, *a2], [*b0, *b1, *b2], [*c0, *c1, *c2]]),
        _ => None,
    }
}

fn parse_poscar(text: &str) -> Result<Structure, String> {
    let lines: Vec<&str> = text.lines().collect();
    let line = |i: usize| -> Result<&str, String> {
        lines
            .get(i)
            .copied()
            .ok_or_else(|| "POSCAR file is truncated".to_string())
    };

    let comment = line(0)?;
    let scale_tokens: Vec<&str> = line(1)?.split_whitespace().collect();
    let scale = parse_f64(scale_tokens.first().copied().unwrap_or_default(), "scale factor")?;

    let mut cell = [
        parse_vec3(line(2)?, "lattice vector")?,
        parse_vec3(line(3)?, "lattice vector")?,
        parse_vec3(line(4)?, "lattice vector")?,
    ];
    // A negative scale is the target cell volume.
    let factor = if scale < 0.0 {
        (scale.abs() / det(&cell).abs()).cbrt()
    } else {
        scale
    };
    for row in cell.iter_mut() {
        for v in row.iter_mut() {
            *v *= factor;
        }
    }

    let mut cursor = 5;
    let first: Vec<&str> = line(cursor)?.split_whitespace().collect();
    let names: Vec<String> = if first.iter().all(|t| t.parse::<usize>().is_ok()) {
        // VASP 4: species names may only appear in the comment line
        comment.split_whitespace().map(str::to_string).collect()
    } else {
        cursor += 1;
        first.iter().map(|t| t.to_string()).collect()
    };
    let counts: Vec<usize> = line(cursor)?
        .split_whitespace()
        .map(|t| t.parse::<usize>().map_err(|_| format!("Invalid species count: '{}'", t)))
        .collect::<Result<_, _>>()?;
    cursor += 1;
    if names.len() < counts.len() {
        return Err("Species names are missing".to_string());
    }

    if line(cursor)?.trim_start().starts_with(['S', 's']) {
        cursor += 1;
    }
    let cartesian = line(cursor)?.trim_start().starts_with(['C', 'c', 'K', 'k']);
    cursor += 1;

    let total = counts
        .iter()
        .try_fold(0usize, |acc, n| acc.checked_add(*n))
        .ok_or_else(|| "Species counts overflow".to_string())?;
    let available = lines.len().saturating_sub(cursor);
    if total > available {
        return Err(format!("Expected {} atoms, found {} position lines", total, available));
    }
    let mut symbols = Vec::with_capacity(total);
    let mut positions = Vec::with_capacity(total);
    for (name, count) in names.iter().zip(&counts) {
        for _ in 0..*count {
            let coords = parse_vec3(line(cursor)?, "atom position")?;
            cursor += 1;
            let position = if cartesian {
                coords.map(|c| c * factor)
            } else {
                fractional_to_cartesian(&coords, &cell)
            };
            symbols.push(name.clone());
            positions.push(position);
        }
    }

    Ok(Structure {
        symbols,
        positions,
        cell: Some(cell),
    })
}

fn fractional_to_cartesian(frac: &Vec3, cell: &[Vec3; 3]) -> Vec3 {
    let mut out = [0.0; 3];
    for (axis, value) in out.iter_mut().enumerate() {
        *value = frac[0] * cell[0][axis] + frac[1] * cell[1][axis] + frac[2] * cell[2][axis];
    }
    out
}

fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn norm(a: &Vec3) -> f64 {
    dot(a, a).sqrt()
}

fn det(m: &[Vec3; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]) - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn angle(a: &Vec3, b: &Vec3) -> f64 {
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        return 0.0;
    }
    (dot(a, b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

fn lattice_parameters(cell: &[Vec3; 3]) -> LatticeParameters {
    LatticeParameters {
        a: norm(&cell[0]),
        b: norm(&cell[1]),
        c: norm(&cell[2]),
        alpha: angle(&cell[1], &cell[2]),
        beta: angle(&cell[0], &cell[2]),
        gamma: angle(&cell[0], &cell[1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SI_POSCAR: &str = "Si2
1.0
  5.43 0.0 0.0
  0.0 5.43 0.0
  0.0 0.0 5.43
Si
2
Direct
  0.0 0.0 0.0
  0.25 0.25 0.25
";

    const WATER_XYZ: &str = "3
water
O 0.000 0.000 0.000
H 0.757 0.586 0.000
H -0.757 0.586 0.000
";

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_poscar_direct_coordinates() {
        let structure = parse_poscar(SI_POSCAR).unwrap();
        assert_eq!(structure.symbols, vec!["Si", "Si"]);
        assert!(approx(structure.positions[1][0], 1.3575));
        let lattice = lattice_parameters(structure.cell.as_ref().unwrap());
        assert!(approx(lattice.a, 5.43));
        assert!(approx(lattice.gamma, 90.0));
    }

    #[test]
    fn test_poscar_selective_dynamics_and_cartesian() {
        let text = "NaCl
2.0
1 0 0
0 1 0
0 0 1
Na Cl
1 1
Selective dynamics
Cartesian
0.0 0.0 0.0 T T T
0.5 0.5 0.5 F F F
";
        let structure = parse_poscar(text).unwrap();
        assert_eq!(structure.symbols, vec!["Na", "Cl"]);
        assert_eq!(structure.positions[1], [1.0, 1.0, 1.0]);
        assert!(approx(det(structure.cell.as_ref().unwrap()), 8.0));
    }

    #[test]
    fn test_poscar_vasp4_names_from_comment() {
        let text = "Ga As
1.0
5.65 0 0
0 5.65 0
0 0 5.65
1 1
Direct
0 0 0
0.25 0.25 0.25
";
        let structure = parse_poscar(text).unwrap();
        assert_eq!(structure.symbols, vec!["Ga", "As"]);
    }

    #[test]
    fn test_truncated_poscar_is_an_error() {
        assert!(parse_poscar("Si\n1.0\n5 0 0\n").is_err());
    }

    #[test]
    fn test_xyz_count_beyond_file_is_an_error() {
        let err = parse_xyz("18446744073709551615\ncomment\nH 0 0 0\n").unwrap_err();
        assert!(err.contains("Expected 18446744073709551615 atoms, found 1"));
        assert!(parse_xyz("10000000000000\n\n").is_err());
    }

    #[test]
    fn test_poscar_count_overflow_is_an_error() {
        let overflowing = "Si\n1.0\n1 0 0\n0 1 0\n0 0 1\nSi Ge\n18446744073709551615 1\nDirect\n0 0 0\n";
        assert_eq!(parse_poscar(overflowing).unwrap_err(), "Species counts overflow");

        let huge = "Si\n1.0\n1 0 0\n0 1 0\n0 0 1\nSi\n10000000000000\nDirect\n0 0 0\n";
        assert!(parse_poscar(huge).unwrap_err().starts_with("Expected 10000000000000 atoms"));
    }

    #[tokio::test]
    async fn test_render_oversized_count_fails_cleanly() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("huge.xyz");
        std::fs::write(&path, "18446744073709551615\ncomment\nH 0 0 0\n").unwrap();
        assert!(matches!(
            StructurePreview::new().render(&path).await,
            Err(VisualizerError::Failed(_))
        ));
    }

    #[test]
    fn test_hill_formula() {
        let counts: BTreeMap<&str, usize> = [("O", 1), ("H", 2)].into_iter().collect();
        assert_eq!(hill_formula(&counts), "H2O");
        let counts: BTreeMap<&str, usize> = [("O", 1), ("H", 4), ("C", 1)].into_iter().collect();
        assert_eq!(hill_formula(&counts), "CH4O");
        let counts: BTreeMap<&str, usize> = [("Ti", 1), ("Sr", 1), ("O", 3)].into_iter().collect();
        assert_eq!(hill_formula(&counts), "O3SrTi");
    }

    #[tokio::test]
    async fn test_render_xyz_model() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("water.xyz");
        std::fs::write(&path, WATER_XYZ).unwrap();

        let shown = StructurePreview::new().render(&path).await.unwrap();
        assert_eq!(shown.formula, "H2O");
        assert_eq!(shown.atom_count, 3);
        assert!(shown.volume.is_none());
        assert!(shown.model.starts_with("3\nGenerated from water.xyz\nO 0.000000 0.000000 0.000000\n"));
    }

    #[tokio::test]
    async fn test_render_poscar_metadata() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("POSCAR");
        std::fs::write(&path, SI_POSCAR).unwrap();

        let shown = StructurePreview::new().render(&path).await.unwrap();
        assert_eq!(shown.formula, "Si2");
        assert_eq!(shown.composition, vec![ElementCount { symbol: "Si".into(), count: 2 }]);
        assert!(approx(shown.volume.unwrap(), 5.43f64.powi(3)));
    }

    #[tokio::test]
    async fn test_cif_is_unavailable() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Si.cif");
        std::fs::write(&path, "data_Si").unwrap();
        assert!(matches!(
            StructurePreview::new().render(&path).await,
            Err(VisualizerError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.xyz");
        std::fs::write(&path, "two\n").unwrap();
        assert!(matches!(
            StructurePreview::new().render(&path).await,
            Err(VisualizerError::Failed(_))
        ));
    }
}
