use leptos::prelude::*;

use crate::api;
use crate::types::{Category, OperationSummary, SessionSummary};
use crate::Mode;

#[component]
pub fn Sidebar(
    session: SessionSummary,
    file_limit: usize,
    categories: Vec<Category>,
    selected: RwSignal<Option<OperationSummary>>,
    mode: RwSignal<Mode>,
    on_refresh: Callback<()>,
) -> impl IntoView {
    let hidden = session.files.len().saturating_sub(file_limit);
    let shown: Vec<String> = session.files.iter().take(file_limit).cloned().collect();

    view! {
        <div class="w-72 bg-gray-800 text-white p-4 flex flex-col overflow-y-auto">
            <h1 class="text-2xl font-bold mb-4">"Masgent"</h1>

            <div class="flex bg-gray-700 rounded-lg p-1 mb-4">
                <ModeButton mode=mode value=Mode::Tools label="Tools"/>
                <ModeButton mode=mode value=Mode::Chat label="Chat"/>
                <ModeButton mode=mode value=Mode::Visualizer label="Visualizer"/>
            </div>

            <section class="mb-4">
                <h2 class="text-xs uppercase text-gray-400 mb-1">"Session"</h2>
                <p class="font-mono text-xs break-all">{session.id.clone()}</p>
                <p class="font-mono text-xs text-gray-400 break-all">{session.directory.clone()}</p>
            </section>

            <section class="mb-4">
                <h2 class="text-xs uppercase text-gray-400 mb-1">"Files"</h2>
                {if shown.is_empty() {
                    view! { <p class="text-sm text-gray-400">"No files yet"</p> }.into_any()
                } else {
                    let session_id = session.id.clone();
                    view! {
                        <ul class="text-sm space-y-1">
                            {shown.into_iter().map(|name| {
                                let url = api::file_url(&session_id, &name);
                                view! {
                                    <li><a href=url download=name.clone() class="font-mono hover:underline">{name.clone()}</a></li>
                                }
                            }).collect::<Vec<_>>()}
                        </ul>
                    }.into_any()
                }}
                {(hidden > 0).then(|| view! {
                    <p class="text-xs text-gray-400 mt-1">{format!("... and {} more", hidden)}</p>
                })}
            </section>

            <section class="mb-4 space-y-2">
                <h2 class="text-xs uppercase text-gray-400">"API keys"</h2>
                <CredentialInput
                    session_id=session.id.clone()
                    kind="gemini"
                    label="Gemini"
                    is_set=session.credentials.gemini
                    on_refresh=on_refresh
                />
                <CredentialInput
                    session_id=session.id.clone()
                    kind="materials_project"
                    label="Materials Project"
                    is_set=session.credentials.materials_project
                    on_refresh=on_refresh
                />
            </section>

            <nav class="flex-1 space-y-3">
                {categories.into_iter().map(|category| view! {
                    <div>
                        <h2 class="text-xs uppercase text-gray-400 mb-1">{category.name.clone()}</h2>
                        {category.operations.into_iter().map(|operation| {
                            let id = operation.id.clone();
                            let label = match &operation.icon {
                                Some(icon) => format!("{} {}", icon, operation.title),
                                None => operation.title.clone(),
                            };
                            view! {
                                <button
                                    class=move || format!(
                                        "block w-full text-left p-2 rounded text-sm transition-colors {}",
                                        if selected.with(|s| s.as_ref().map(|s| s.id == id).unwrap_or(false)) {
                                            "bg-gray-700"
                                        } else {
                                            "hover:bg-gray-700"
                                        }
                                    )
                                    on:click=move |_| {
                                        selected.set(Some(operation.clone()));
                                        mode.set(Mode::Tools);
                                    }
                                >
                                    {label}
                                </button>
                            }
                        }).collect::<Vec<_>>()}
                    </div>
                }).collect::<Vec<_>>()}
            </nav>
        </div>
    }
}

#[component]
fn ModeButton(mode: RwSignal<Mode>, value: Mode, label: &'static str) -> impl IntoView {
    view! {
        <button
            class=move || format!(
                "flex-1 px-2 py-1 rounded text-sm {}",
                if mode.get() == value { "bg-gray-900" } else { "text-gray-300 hover:text-white" }
            )
            on:click=move |_| mode.set(value)
        >
            {label}
        </button>
    }
}

#[component]
fn CredentialInput(
    session_id: String,
    kind: &'static str,
    label: &'static str,
    is_set: bool,
    on_refresh: Callback<()>,
) -> impl IntoView {
    let (value, set_value) = signal(String::new());
    let (error, set_error) = signal(Option::<String>::None);
    let clear_session = session_id.clone();

    let on_save = move |_| {
        let secret = value.get_untracked();
        if secret.trim().is_empty() {
            return;
        }
        let session = session_id.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match api::set_credential(&session, kind, &secret).await {
                Ok(_) => {
                    set_value.set(String::new());
                    on_refresh.run(());
                }
                Err(e) => set_error.set(Some(e)),
            }
        });
    };

    let on_clear = move |_| {
        let session = clear_session.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match api::delete_credential(&session, kind).await {
                Ok(_) => on_refresh.run(()),
                Err(e) => set_error.set(Some(e)),
            }
        });
    };

    view! {
        <div>
            <label class="text-xs text-gray-300">
                {label}
                {if is_set { " ✓" } else { "" }}
            </label>
            <div class="flex gap-1">
                <input
                    type="password"
                    class="flex-1 px-2 py-1 rounded text-sm text-gray-900"
                    placeholder=if is_set { "Key set" } else { "Enter key" }
                    prop:value=move || value.get()
                    on:input=move |ev| set_value.set(event_target_value(&ev))
                />
                <button class="px-2 text-xs bg-gray-600 rounded hover:bg-gray-500" on:click=on_save>"Save"</button>
                {is_set.then(|| view! {
                    <button class="px-2 text-xs bg-gray-600 rounded hover:bg-gray-500" on:click=on_clear>"Clear"</button>
                })}
            </div>
            {move || error.get().map(|e| view! { <p class="text-xs text-red-300">{e}</p> })}
        </div>
    }
}
