use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use efiforge::models::{
    Audio, FormFactor, GenerationOptions, HardwareProfile, Network, NetworkDevice,
};
use efiforge::services::{ConfigSynthesizer, ManifestBuilder, validate};
use std::hint::black_box;

fn minimal_profile() -> HardwareProfile {
    HardwareProfile::new("Intel", "ASUS")
}

fn full_profile() -> HardwareProfile {
    let mut profile = HardwareProfile::new("Intel", "Dell");
    profile.cpu.generation = Some("Comet Lake".to_string());
    profile.form_factor = FormFactor::Laptop;
    profile.audio = Some(Audio {
        codec: "ALC256".to_string(),
        layout_id: None,
    });
    profile.network = Some(Network {
        ethernet: Some(NetworkDevice {
            model: "Intel I219-V".to_string(),
        }),
        wifi: Some(NetworkDevice {
            model: "Intel AX201".to_string(),
        }),
        bluetooth: Some(NetworkDevice {
            model: "Intel AX201 Bluetooth".to_string(),
        }),
    });
    profile
}

fn bench_synthesize(c: &mut Criterion) {
    let options = GenerationOptions::default();
    let mut group = c.benchmark_group("synthesize");

    for (name, profile) in [("minimal", minimal_profile()), ("laptop", full_profile())] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &profile, |b, profile| {
            b.iter(|| {
                ConfigSynthesizer::seeded(42)
                    .synthesize(black_box(profile), &options)
                    .map(|s| s.document)
            })
        });
    }
    group.finish();
}

fn bench_validate_and_serialize(c: &mut Criterion) {
    let doc = ConfigSynthesizer::seeded(42)
        .synthesize(&full_profile(), &GenerationOptions::default())
        .map(|s| s.document)
        .unwrap();

    c.bench_function("validate", |b| b.iter(|| validate(black_box(&doc))));
    c.bench_function("to_xml", |b| b.iter(|| black_box(&doc).to_xml()));
}

fn bench_manifest(c: &mut Criterion) {
    let options = GenerationOptions::default();
    let doc = ConfigSynthesizer::seeded(42)
        .synthesize(&full_profile(), &options)
        .map(|s| s.document)
        .unwrap();
    let builder = ManifestBuilder::with_embedded_catalog().unwrap();

    c.bench_function("manifest_build", |b| {
        b.iter(|| builder.build(black_box(&doc), &options))
    });
}

criterion_group!(
    benches,
    bench_synthesize,
    bench_validate_and_serialize,
    bench_manifest
);
criterion_main!(benches);
