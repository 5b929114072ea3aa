//! Form for one operation.
//!
//! Every input change posts the whole interaction back to the server and
//! redraws whatever form it returns.

use leptos::prelude::*;

use super::results::ReportView;
use super::widgets::{InputCallback, WidgetView};
use crate::api;
use crate::types::{ExecutionReport, Interaction, OperationSummary, RenderedForm, WidgetInput};

#[component]
pub fn OperationForm(
    session_id: String,
    operation: OperationSummary,
    on_files_changed: Callback<()>,
) -> impl IntoView {
    let interaction = RwSignal::new(Interaction::new());
    let (form, set_form) = signal(Option::<Result<RenderedForm, String>>::None);
    let (report, set_report) = signal(Option::<Result<ExecutionReport, String>>::None);
    let (running, set_running) = signal(false);
    let optional_toggled = RwSignal::new(false);

    let render_session = session_id.clone();
    let render_operation = operation.id.clone();
    Effect::new(move |_| {
        let snapshot = interaction.get();
        let session = render_session.clone();
        let operation = render_operation.clone();
        let uploaded = snapshot
            .values()
            .any(|input| matches!(input, WidgetInput::File(file) if file.upload.is_some()));
        wasm_bindgen_futures::spawn_local(async move {
            let rendered = api::render_form(&session, &operation, &snapshot).await;
            set_form.set(Some(rendered));
            if uploaded {
                on_files_changed.run(());
            }
        });
    });

    let on_input: InputCallback = Callback::new(move |(field, input): (String, WidgetInput)| {
        interaction.update(|current| {
            current.insert(field, input);
        });
    });

    let execute_session = session_id.clone();
    let execute_operation = operation.id.clone();
    let on_execute = move |_| {
        let session = execute_session.clone();
        let operation = execute_operation.clone();
        let snapshot = interaction.get_untracked();
        set_running.set(true);
        wasm_bindgen_futures::spawn_local(async move {
            set_report.set(Some(api::execute(&session, &operation, &snapshot).await));
            set_running.set(false);
            on_files_changed.run(());
        });
    };

    let title = match &operation.icon {
        Some(icon) => format!("{} {}", icon, operation.title),
        None => operation.title.clone(),
    };

    view! {
        <div class="space-y-4">
            <div>
                <h2 class="text-2xl font-bold">{title}</h2>
                {(!operation.description.is_empty()).then(|| view! {
                    <p class="text-gray-600 mt-1">{operation.description.clone()}</p>
                })}
            </div>

            <div class="bg-white rounded-lg shadow p-4">
                {move || match form.get() {
                    None => view! { <div class="text-gray-500">"Loading form..."</div> }.into_any(),
                    Some(Err(e)) => view! { <div class="text-red-700">{e}</div> }.into_any(),
                    Some(Ok(rendered)) => {
                        view! { <FormBody form=rendered on_input=on_input toggled=optional_toggled/> }.into_any()
                    }
                }}
            </div>

            <button
                class="bg-green-500 hover:bg-green-600 text-white px-4 py-2 rounded disabled:opacity-50"
                disabled=move || running.get() || !matches!(form.get(), Some(Ok(_)))
                on:click=on_execute
            >
                {move || if running.get() { "Running..." } else { "Execute" }}
            </button>

            {move || report.get().map(|result| match result {
                Ok(report) => view! { <ReportView report=report session_id=session_id.clone()/> }.into_any(),
                Err(e) => view! { <div class="text-red-700">{e}</div> }.into_any(),
            })}
        </div>
    }
}

#[component]
fn FormBody(form: RenderedForm, on_input: InputCallback, toggled: RwSignal<bool>) -> impl IntoView {
    view! {
        <div>
            {form.required.into_iter().map(|widget| view! { <WidgetView widget=widget on_input=on_input/> }).collect::<Vec<_>>()}
            {form.optional.map(|group| {
                // The server decides the initial state; each click flips it.
                let expanded = group.expanded;
                let visible = move || toggled.get() != expanded;
                view! {
                    <div class="mt-2 border-t pt-2">
                        <button
                            type="button"
                            class="text-sm font-medium text-gray-700 mb-2"
                            on:click=move |_| toggled.update(|t| *t = !*t)
                        >
                            {move || if visible() { "▾ Optional Parameters" } else { "▸ Optional Parameters" }}
                        </button>
                        <div class:hidden=move || !visible()>
                            {group.widgets.into_iter().map(|widget| view! { <WidgetView widget=widget on_input=on_input/> }).collect::<Vec<_>>()}
                        </div>
                    </div>
                }
            })}
        </div>
    }
}
