use leptos::prelude::*;

use crate::api;
use crate::types::{ChatLog, ChatRole};

#[component]
pub fn ChatPanel(
    session_id: String,
    #[prop(into)] gemini_set: Signal<bool>,
    on_files_changed: Callback<()>,
) -> impl IntoView {
    let log = RwSignal::new(ChatLog::default());
    let (draft, set_draft) = signal(String::new());
    let (busy, set_busy) = signal(false);
    let (error, set_error) = signal(Option::<String>::None);

    let initial_session = session_id.clone();
    wasm_bindgen_futures::spawn_local(async move {
        match api::get_chat(&initial_session).await {
            Ok(loaded) => log.set(loaded),
            Err(e) => set_error.set(Some(e)),
        }
    });

    // Runs one chat request and folds its result into the log.
    let run = move |request: ChatRequest| {
        let session = session_id.clone();
        set_busy.set(true);
        set_error.set(None);
        wasm_bindgen_futures::spawn_local(async move {
            let result = match &request {
                ChatRequest::Send(message) => api::send_chat(&session, message).await,
                ChatRequest::Confirm => api::confirm_plan(&session).await,
                ChatRequest::Cancel => api::cancel_plan(&session).await,
                ChatRequest::Clear => api::clear_chat(&session).await,
            };
            match result {
                Ok(updated) => {
                    log.set(updated);
                    if matches!(request, ChatRequest::Send(_)) {
                        set_draft.set(String::new());
                    }
                    if matches!(request, ChatRequest::Confirm) {
                        on_files_changed.run(());
                    }
                }
                Err(e) => set_error.set(Some(e)),
            }
            set_busy.set(false);
        });
    };
    let run = StoredValue::new(run);

    view! {
        <div class="flex flex-col h-full space-y-4">
            <div class="flex justify-between items-center">
                <h2 class="text-2xl font-bold">"Chat"</h2>
                <button
                    class="px-3 py-1 text-sm border rounded hover:bg-gray-50"
                    disabled=move || busy.get()
                    on:click=move |_| run.with_value(|run| run(ChatRequest::Clear))
                >
                    "Clear"
                </button>
            </div>

            {move || (!gemini_set.get()).then(|| view! {
                <div class="bg-yellow-50 border border-yellow-200 rounded-lg p-3 text-yellow-800 text-sm">
                    "Please set your Gemini API key to use chat mode"
                </div>
            })}

            <div class="flex-1 space-y-3 overflow-y-auto">
                {move || log.get().messages.into_iter().map(|message| {
                    let (class, who) = match message.role {
                        ChatRole::User => ("bg-blue-50 rounded-lg p-3 ml-12", "You"),
                        ChatRole::Assistant => ("bg-white shadow rounded-lg p-3 mr-12", "Assistant"),
                        ChatRole::Plan => ("bg-purple-50 rounded-lg p-3 mr-12", "Plan"),
                        ChatRole::Result => ("bg-green-50 rounded-lg p-3 mr-12", "Result"),
                    };
                    view! {
                        <div class=class>
                            <div class="text-xs text-gray-500 mb-1">{who}</div>
                            <div class="text-sm whitespace-pre-wrap">{message.content}</div>
                        </div>
                    }
                }).collect::<Vec<_>>()}
            </div>

            {move || log.get().pending_plan.map(|plan| view! {
                <div class="bg-purple-50 border border-purple-200 rounded-lg p-4">
                    <p class="font-semibold mb-2">"Proposed plan"</p>
                    <pre class="text-sm whitespace-pre-wrap">{plan}</pre>
                    <div class="flex gap-2 mt-3">
                        <button
                            class="bg-green-500 hover:bg-green-600 text-white px-4 py-2 rounded disabled:opacity-50"
                            disabled=move || busy.get()
                            on:click=move |_| run.with_value(|run| run(ChatRequest::Confirm))
                        >
                            "Confirm"
                        </button>
                        <button
                            class="px-4 py-2 border rounded hover:bg-gray-50 disabled:opacity-50"
                            disabled=move || busy.get()
                            on:click=move |_| run.with_value(|run| run(ChatRequest::Cancel))
                        >
                            "Cancel"
                        </button>
                    </div>
                </div>
            })}

            {move || error.get().map(|e| view! { <div class="text-sm text-red-700">{e}</div> })}

            <div class="flex gap-2">
                <textarea
                    class="flex-1 px-3 py-2 border rounded"
                    rows="2"
                    placeholder="Ask Masgent..."
                    prop:value=move || draft.get()
                    on:input=move |ev| set_draft.set(event_target_value(&ev))
                ></textarea>
                <button
                    class="bg-blue-500 hover:bg-blue-600 text-white px-4 py-2 rounded disabled:opacity-50"
                    disabled=move || busy.get() || draft.get().trim().is_empty()
                    on:click=move |_| {
                        let message = draft.get_untracked();
                        run.with_value(|run| run(ChatRequest::Send(message)));
                    }
                >
                    {move || if busy.get() { "Thinking..." } else { "Send" }}
                </button>
            </div>
        </div>
    }
}

enum ChatRequest {
    Send(String),
    Confirm,
    Cancel,
    Clear,
}
