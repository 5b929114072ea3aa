use criterion::{black_box, criterion_group, criterion_main, Criterion};
use masgent_web::domain::FormSchema;
use masgent_web::engine::assist::AssistRegistry;
use masgent_web::engine::{validate, FormAssembler, FormPolicy, Interaction, ResultDispatcher, WidgetInput};
use masgent_web::session::SessionFileStore;
use serde_json::json;

fn schema() -> FormSchema {
    FormSchema::from_json_schema(&json!({
        "type": "object",
        "properties": {
            "poscar_path": {"type": "string"},
            "scaling_matrix": {"type": "string", "default": "2 0 0; 0 2 0; 0 0 2"},
            "functional": {"enum": ["PBE", "PBEsol", "SCAN"], "default": "PBE"},
            "kpoints": {"type": "array", "items": {"type": "integer"}, "default": [4, 4, 4]},
            "encut": {"type": "number", "default": 520.0},
            "nsw": {"type": "integer", "default": 100},
            "spin_polarized": {"type": "boolean", "default": false},
            "incar_overrides": {"type": "object", "default": {"ISMEAR": 0}}
        },
        "required": ["poscar_path"]
    }))
    .expect("benchmark schema")
}

fn benchmark_render_pass(c: &mut Criterion) {
    let temp = tempfile::TempDir::new().expect("temp dir");
    let store = SessionFileStore::open(temp.path()).expect("store");
    for i in 0..10 {
        store.persist(&format!("POSCAR_{}.vasp", i), b"Si\n1.0\n").expect("persist");
    }
    let policy = FormPolicy::default();
    let assists = AssistRegistry::builtin();
    let schema = schema();
    let interaction: Interaction = [
        ("kpoints".to_string(), WidgetInput::Text("6, 6, 6".to_string())),
        ("nsw".to_string(), WidgetInput::Integer(200)),
    ]
    .into_iter()
    .collect();

    c.bench_function("render_pass", |b| {
        let assembler = FormAssembler::new(&policy, &assists, &store);
        b.iter(|| black_box(assembler.assemble(&schema, black_box(&interaction))))
    });

    let form = FormAssembler::new(&policy, &assists, &store).assemble(&schema, &interaction);
    c.bench_function("validate_pass", |b| {
        b.iter(|| black_box(validate(&schema, black_box(&form.state))))
    });
}

fn benchmark_dispatch(c: &mut Criterion) {
    let policy = FormPolicy::default();
    let result = json!({"energy": -10.84, "converged": true, "steps": 12});

    c.bench_function("dispatch_mapping", |b| {
        let dispatcher = ResultDispatcher::new(&policy);
        b.iter(|| black_box(dispatcher.dispatch(black_box(&result))))
    });
}

criterion_group!(benches, benchmark_render_pass, benchmark_dispatch);
criterion_main!(benches);
