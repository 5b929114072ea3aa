use leptos::prelude::*;

use super::widgets::NoticeLine;
use crate::api;
use crate::types::{Visualization, VisualizationOutcome};

#[component]
pub fn Visualizer(session_id: String, #[prop(into)] files: Signal<Vec<String>>) -> impl IntoView {
    let (chosen, set_chosen) = signal(Option::<String>::None);
    let (outcome, set_outcome) = signal(Option::<Result<VisualizationOutcome, String>>::None);
    let (loading, set_loading) = signal(false);

    let list_session = session_id.clone();
    let structures = LocalResource::new(move || {
        files.track();
        let session = list_session.clone();
        async move { api::list_structures(&session).await }
    });

    let on_visualize = move |_| {
        let Some(file) = chosen.get_untracked() else {
            return;
        };
        let session = session_id.clone();
        set_loading.set(true);
        wasm_bindgen_futures::spawn_local(async move {
            set_outcome.set(Some(api::visualize(&session, &file).await));
            set_loading.set(false);
        });
    };

    view! {
        <div class="space-y-4">
            <h2 class="text-2xl font-bold">"Structure Visualizer"</h2>
            <Suspense fallback=move || view! { <div class="text-gray-500">"Loading..."</div> }>
                {move || structures.get().map(|result| match result {
                    Ok(list) if list.is_empty() => view! {
                        <div class="bg-blue-50 border border-blue-200 rounded-lg p-4 text-blue-800">
                            "No structure files found in session. Upload or generate a structure first."
                        </div>
                    }.into_any(),
                    Ok(list) => {
                        if chosen.get_untracked().is_none() {
                            set_chosen.set(list.first().cloned());
                        }
                        view! {
                            <select
                                class="w-full px-3 py-2 border rounded"
                                on:change=move |ev| set_chosen.set(Some(event_target_value(&ev)))
                            >
                                {list.into_iter().map(|name| {
                                    let is_selected = chosen.get_untracked().as_deref() == Some(name.as_str());
                                    view! { <option value=name.clone() selected=is_selected>{name.clone()}</option> }
                                }).collect::<Vec<_>>()}
                            </select>
                        }.into_any()
                    }
                    Err(e) => view! { <div class="text-red-700">{e}</div> }.into_any(),
                })}
            </Suspense>
            <button
                class="bg-blue-500 hover:bg-blue-600 text-white px-4 py-2 rounded disabled:opacity-50"
                disabled=move || loading.get() || chosen.get().is_none()
                on:click=on_visualize
            >
                {move || if loading.get() { "Rendering..." } else { "Visualize" }}
            </button>
            {move || outcome.get().map(|result| match result {
                Ok(outcome) => view! { <VisualizationView outcome=outcome/> }.into_any(),
                Err(e) => view! { <div class="text-red-700">{e}</div> }.into_any(),
            })}
        </div>
    }
}

#[component]
pub fn VisualizationView(outcome: VisualizationOutcome) -> impl IntoView {
    match outcome {
        VisualizationOutcome::Skipped { notice } => view! { <NoticeLine notice=notice/> }.into_any(),
        VisualizationOutcome::Rendered { visualization } => {
            view! { <StructureCard visualization=visualization/> }.into_any()
        }
    }
}

#[component]
fn StructureCard(visualization: Visualization) -> impl IntoView {
    let Visualization { file_name, format, model, formula, atom_count, composition, lattice, volume } = visualization;

    view! {
        <div class="bg-white rounded-lg shadow p-4 space-y-3">
            <div class="flex justify-between">
                <h3 class="text-lg font-semibold">{formula}</h3>
                <span class="text-sm text-gray-500 font-mono">{file_name}</span>
            </div>
            <p class="text-sm">{format!("{} atoms", atom_count)}</p>
            <div class="flex flex-wrap gap-2">
                {composition.into_iter().map(|element| view! {
                    <span class="bg-gray-100 rounded px-2 py-1 text-sm font-mono">
                        {format!("{} {}", element.symbol, element.count)}
                    </span>
                }).collect::<Vec<_>>()}
            </div>
            {lattice.map(|l| view! {
                <div class="grid grid-cols-3 gap-2 text-sm font-mono">
                    <span>{format!("a = {:.4} Å", l.a)}</span>
                    <span>{format!("b = {:.4} Å", l.b)}</span>
                    <span>{format!("c = {:.4} Å", l.c)}</span>
                    <span>{format!("α = {:.2}°", l.alpha)}</span>
                    <span>{format!("β = {:.2}°", l.beta)}</span>
                    <span>{format!("γ = {:.2}°", l.gamma)}</span>
                </div>
            })}
            {volume.map(|v| view! { <p class="text-sm">{format!("Volume: {:.3} Å³", v)}</p> })}
            <details>
                <summary class="text-sm text-gray-600 cursor-pointer">{format!("{} model", format.to_uppercase())}</summary>
                <pre class="mt-2 text-xs bg-gray-50 p-2 rounded overflow-x-auto">{model}</pre>
            </details>
        </div>
    }
}
