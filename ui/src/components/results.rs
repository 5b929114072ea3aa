use leptos::prelude::*;
use serde_json::Value;

use super::visualizer::VisualizationView;
use super::widgets::NoticeLine;
use crate::api;
use crate::types::{DisplayInstructions, ExecutionReport, ResultKind};

#[component]
pub fn ReportView(report: ExecutionReport, session_id: String) -> impl IntoView {
    match report {
        ExecutionReport::Invalid { messages } => view! {
            <div class="bg-red-50 border border-red-200 rounded-lg p-4">
                <p class="text-red-800 font-semibold mb-2">"Input validation failed"</p>
                <ul class="list-disc ml-5 text-sm text-red-700">
                    {messages.into_iter().map(|m| view! { <li>{m}</li> }).collect::<Vec<_>>()}
                </ul>
            </div>
        }
        .into_any(),
        ExecutionReport::Failed { message, detail } => view! {
            <div class="bg-red-50 border border-red-200 rounded-lg p-4">
                <p class="text-red-800 font-semibold">{message}</p>
                <details class="mt-2">
                    <summary class="text-sm text-red-700 cursor-pointer">"Error details"</summary>
                    <pre class="mt-2 text-xs bg-white p-2 rounded overflow-x-auto">{detail}</pre>
                </details>
            </div>
        }
        .into_any(),
        ExecutionReport::Completed { display, visualization } => view! {
            <div class="space-y-4">
                <DisplayView display=display session_id=session_id/>
                {visualization.map(|outcome| view! { <VisualizationView outcome=outcome/> })}
            </div>
        }
        .into_any(),
    }
}

#[component]
fn DisplayView(display: DisplayInstructions, session_id: String) -> impl IntoView {
    let body = match display.kind {
        ResultKind::NoOutput => view! { <div></div> }.into_any(),
        ResultKind::File { file_name, preview, downloadable, .. } => {
            let url = api::file_url(&session_id, &file_name);
            view! {
                <div class="bg-white rounded-lg shadow p-4">
                    <div class="flex justify-between items-center">
                        <span class="font-mono text-sm">{file_name.clone()}</span>
                        {downloadable.then(|| view! {
                            <a href=url download=file_name.clone() class="bg-blue-500 hover:bg-blue-600 text-white text-sm px-3 py-1 rounded">
                                "Download"
                            </a>
                        })}
                    </div>
                    {preview.map(|text| view! {
                        <pre class="mt-3 text-xs bg-gray-50 p-2 rounded overflow-x-auto">{text}</pre>
                    })}
                </div>
            }
            .into_any()
        }
        ResultKind::Text { text } => view! {
            <pre class="bg-white rounded-lg shadow p-4 text-sm whitespace-pre-wrap">{text}</pre>
        }
        .into_any(),
        ResultKind::Mapping { entries } => view! {
            <table class="min-w-full bg-white rounded-lg shadow text-sm">
                <tbody>
                    {entries.into_iter().map(|(key, value)| view! {
                        <tr class="border-b">
                            <td class="px-3 py-2 font-medium text-gray-700">{key}</td>
                            <td class="px-3 py-2 font-mono">{display_value(&value)}</td>
                        </tr>
                    }).collect::<Vec<_>>()}
                </tbody>
            </table>
        }
        .into_any(),
        ResultKind::FileList { file_names, .. } => view! {
            <ul class="bg-white rounded-lg shadow divide-y">
                {file_names.into_iter().map(|name| {
                    let url = api::file_url(&session_id, &name);
                    view! {
                        <li class="flex justify-between items-center px-3 py-2">
                            <span class="font-mono text-sm">{name.clone()}</span>
                            <a href=url download=name class="text-blue-600 text-sm hover:underline">"Download"</a>
                        </li>
                    }
                }).collect::<Vec<_>>()}
            </ul>
        }
        .into_any(),
        ResultKind::List { items } => view! {
            <ol class="list-decimal ml-5 bg-white rounded-lg shadow p-4 text-sm">
                {items.iter().map(|item| view! { <li class="font-mono">{display_value(item)}</li> }).collect::<Vec<_>>()}
            </ol>
        }
        .into_any(),
        ResultKind::Opaque { value } => view! {
            <pre class="bg-white rounded-lg shadow p-4 text-xs">
                {serde_json::to_string_pretty(&value).unwrap_or_default()}
            </pre>
        }
        .into_any(),
    };

    view! {
        <div class="space-y-2">
            {display.notice.map(|notice| view! { <NoticeLine notice=notice/> })}
            {body}
        </div>
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
